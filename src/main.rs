use spor::app;
use spor::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    app::run().await
}
