//! Results-list expansion: load the "published today" search, then click
//! "show more" until enough cards are present.

use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use thirtyfour::prelude::*;

/// Search results with the "published today" filter baked into the URL.
pub const SEARCH_URL: &str =
    "https://www.ess.gov.si/iskalci-zaposlitve/iskanje-zaposlitve/rezultati?objava=danes";

pub const JOB_CARD: &str = "article.job-card";
const RESULT_COUNT: &str = "span.results-count";
const SHOW_MORE: &str = "button.show-more";

const FIRST_RESULT_WAIT_SECS: u64 = 30;
const CLICK_PAUSE_MILLIS: u64 = 1500;
const MAX_SHOW_MORE_ATTEMPTS: usize = 60;

/// Loads the search page and expands the list. Returns the number of loaded
/// cards, capped at the limit when one is given; zero when the initial wait
/// times out.
pub async fn load_result_cards(driver: &WebDriver, limit: Option<usize>) -> Result<usize> {
    driver
        .goto(SEARCH_URL)
        .await
        .context("Failed to open the search results page")?;

    let first_card = driver
        .query(By::Css(JOB_CARD))
        .wait(
            Duration::from_secs(FIRST_RESULT_WAIT_SECS),
            Duration::from_millis(500),
        )
        .first()
        .await;
    if first_card.is_err() {
        eprintln!("Timed out waiting for job results to render");
        return Ok(0);
    }

    let advertised = read_total_count(driver).await;
    let mut loaded = driver.find_all(By::Css(JOB_CARD)).await?.len();

    let target = match (limit, advertised) {
        (Some(limit), Some(total)) => limit.min(total),
        (Some(limit), None) => limit,
        (None, Some(total)) => total,
        (None, None) => usize::MAX,
    };

    let mut attempts = 0;
    while loaded < target && attempts < MAX_SHOW_MORE_ATTEMPTS {
        let buttons = driver.find_all(By::Css(SHOW_MORE)).await?;
        let button = match buttons.into_iter().next() {
            Some(button) => button,
            None => {
                println!("Show-more control no longer present, {} cards loaded", loaded);
                break;
            }
        };

        if button.scroll_into_view().await.is_err() || button.click().await.is_err() {
            // Stale or obscured control; treat like it disappeared.
            break;
        }
        tokio::time::sleep(Duration::from_millis(CLICK_PAUSE_MILLIS)).await;

        loaded = driver.find_all(By::Css(JOB_CARD)).await?.len();
        attempts += 1;
    }

    if attempts >= MAX_SHOW_MORE_ATTEMPTS {
        println!(
            "Stopping after {} show-more attempts with {} cards loaded",
            attempts, loaded
        );
    }

    if let Some(limit) = limit {
        loaded = loaded.min(limit);
    }
    println!(
        "Loaded {} job cards (advertised total: {})",
        loaded,
        advertised
            .map(|total| total.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    Ok(loaded)
}

async fn read_total_count(driver: &WebDriver) -> Option<usize> {
    let element = driver
        .find_all(By::Css(RESULT_COUNT))
        .await
        .ok()?
        .into_iter()
        .next()?;
    let text = element.text().await.ok()?;
    parse_count(&text)
}

/// First run of digits in a label like "128 prostih delovnih mest";
/// dots are stripped first so "1.024" parses as 1024.
fn parse_count(text: &str) -> Option<usize> {
    let cleaned = text.replace('.', "");
    if let Ok(re) = Regex::new(r"\d+") {
        if let Some(m) = re.find(&cleaned) {
            return m.as_str().parse().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_count_out_of_label_text() {
        assert_eq!(parse_count("128 prostih delovnih mest"), Some(128));
        assert_eq!(parse_count("Zadetkov: 7"), Some(7));
        assert_eq!(parse_count("1.024 zadetkov"), Some(1024));
    }

    #[test]
    fn missing_count_is_none() {
        assert_eq!(parse_count("ni zadetkov danes"), None);
        assert_eq!(parse_count(""), None);
    }
}
