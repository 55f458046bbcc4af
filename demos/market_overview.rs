use resilient_fetch::{CacheMode, ClientOptions, StocksApi};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url =
        std::env::var("MARKET_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_owned());

    let stocks = StocksApi::new(ClientOptions {
        base_url,
        ..StocksApi::default_options()
    });

    let quotes = stocks.market_overview(CacheMode::Use).await?;
    for quote in &quotes {
        println!(
            "{:<8} {:<24} {:>10} {:+.2}",
            quote.symbol,
            quote.name,
            quote.formatted_price(),
            quote.change
        );
        if let Some(article) = &quote.news_article {
            println!("         {} ({})", article.title, article.publisher);
        }
    }

    let missing: Vec<_> = stocks
        .expected_tickers()
        .iter()
        .filter(|ticker| !quotes.iter().any(|quote| quote.symbol == **ticker))
        .collect();
    if !missing.is_empty() {
        println!("missing tickers: {missing:?}");
    }

    // Served from the cache without touching the network.
    let again = stocks.market_overview(CacheMode::Use).await?;
    println!(
        "cached {} quotes, {} cache entries",
        again.len(),
        stocks.client().cache_stats().total_entries
    );

    Ok(())
}
