#[tokio::main]
async fn main() -> anyhow::Result<()> {
    screenshot_ocr_lib::run().await
}
