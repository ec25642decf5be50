use reddit_client::callback::parse_callback_target;
use reddit_client::{CallbackListener, RedditClient, RedditOAuth2Config};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Callback Demo ===\n");

    let config = RedditOAuth2Config::new(
        "demo_client_id".to_string(),
        "demo_client_secret".to_string(),
        "http://localhost:8080".to_string(),
        "reddit-eraser/0.1 demo".to_string(),
    );
    let mut client = RedditClient::new(config)?;

    let scopes = RedditClient::get_required_scopes();
    let (auth_url, csrf_token) = client.generate_auth_url(&scopes)?;
    println!("Generated auth URL: {}", auth_url);
    println!("State: {}\n", csrf_token.secret());

    let samples = [
        "/?state=uniquestate&code=test123",
        "/?state=uniquestate&error=access_denied",
        "/?code=test123",
        "/?state=wrong&code=test123",
        "/",
    ];
    for (i, target) in samples.iter().enumerate() {
        println!("Sample {}: {}", i + 1, target);
        let payload = parse_callback_target(target)?;
        match client.accept_callback(payload, &csrf_token) {
            Ok(code) => println!("  accepted, code = {}", code.secret()),
            Err(e) => println!("  rejected: {}", e),
        }
    }

    let port = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u16>().ok())
        .unwrap_or(8080);
    let listener = CallbackListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await?;

    println!("\n=== Live Test ===");
    println!(
        "Open http://{}/?state=uniquestate&code=hello in a browser (or curl it).",
        listener.local_addr()
    );

    let payload = listener.wait().await;
    println!("Captured: {:?}", payload);
    match client.accept_callback(payload, &csrf_token) {
        Ok(code) => println!("Accepted code: {}", code.secret()),
        Err(e) => println!("Rejected: {}", e),
    }

    Ok(())
}
