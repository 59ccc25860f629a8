#[tokio::main]
async fn main() {
    mixtape::start_server().await;
}
