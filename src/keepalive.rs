use tokio::time::{Duration, interval};

// Pings the companion bot on a fixed interval so its host doesn't idle out.
// Failures are logged and otherwise ignored.
pub async fn keepalive_pinger(client: reqwest::Client, url: String, ping_interval: Duration) {
    let mut ticker = interval(ping_interval);

    tracing::info!(%url, interval = ?ping_interval, "keep-alive pinger started");

    loop {
        ticker.tick().await;

        match client.get(&url).timeout(Duration::from_secs(10)).send().await {
            Ok(res) if res.status().is_success() => {
                tracing::debug!(%url, "bot ping ok");
            }
            Ok(res) => {
                tracing::warn!(%url, status = res.status().as_u16(), "bot ping failed");
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "bot ping errored");
            }
        }
    }
}
