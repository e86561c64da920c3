use tickwatch::error::TickwatchError;

#[tokio::main]
async fn main() -> Result<(), TickwatchError> {
    tickwatch::app::run().await
}
