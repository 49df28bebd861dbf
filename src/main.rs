#[tokio::main]
async fn main() -> std::io::Result<()> {
    booking_calendar::run().await
}
