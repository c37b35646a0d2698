#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    baking_forest::run().await
}
