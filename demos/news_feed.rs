use resilient_fetch::{ClientOptions, FetchError, NewsApi, NewsFilters};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url =
        std::env::var("MARKET_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_owned());
    let ticker = std::env::args().nth(1).unwrap_or_else(|| "MDB".to_owned());

    let news = NewsApi::new(ClientOptions {
        base_url,
        ..NewsApi::default_options()
    });

    match news.ticker_news(&ticker, NewsFilters::default()).await {
        Ok(articles) => {
            for article in articles {
                println!(
                    "{}  {:<20} {}",
                    article.date.format("%Y-%m-%d %H:%M"),
                    article.publisher,
                    article.title
                );
            }
        }
        Err(err @ FetchError::InvalidRequest(_)) => {
            eprintln!("{err}");
            return Ok(());
        }
        Err(err) => {
            eprintln!("{}", err.user_message());
            return Err(err.into());
        }
    }

    let publishers = news.unique_publishers().await;
    println!("publishers: {}", publishers.join(", "));

    Ok(())
}
