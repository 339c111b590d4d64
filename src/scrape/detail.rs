//! Per-card detail extraction: activate a card, read the detail view, then
//! return to the list through an ordered chain of back strategies.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Local;
use scraper::{Html, Selector};
use thirtyfour::prelude::*;

use super::lister::{JOB_CARD, SEARCH_URL};
use crate::types::RawJob;

const CARD_TITLE: &str = "h2.title";
const CARD_COMPANY: &str = "div.employer";

const DETAIL_VIEW: &str = "div.job-detail";
const DETAIL_TITLE: &str = "div.job-detail h1";
const DETAIL_COMPANY: &str = "div.job-detail .employer-name";
const DETAIL_LOCATION: &str = "div.job-detail .job-location";
const DETAIL_DESCRIPTION: &str = "div.job-detail .description";
const DETAIL_REQUIREMENTS: &str = "div.job-detail .requirements li";
const DETAIL_BENEFITS: &str = "div.job-detail .benefits li";
const DETAIL_APPLICATION: &str = "div.job-detail .application-method";
const DETAIL_CONTACT: &str = "div.job-detail .contact-info";
const DETAIL_POSTED: &str = "div.job-detail .posted-date";

const BACK_BUTTON: &str = "button.back-to-results";
const CLOSE_BUTTON: &str = "div.job-detail button.close";

const DETAIL_WAIT_SECS: u64 = 30;
const RENDER_PAUSE_MILLIS: u64 = 1000;

/// Placeholder for a title that never resolved; such records are dropped.
pub const UNRESOLVED_TITLE: &str = "Unknown Title";

/// Walks the first `count` cards in list order. A card whose title never
/// resolves is dropped; every other record is kept, however partial.
pub async fn extract_jobs(driver: &WebDriver, count: usize) -> Vec<RawJob> {
    let mut jobs = Vec::new();
    for index in 0..count {
        match extract_job(driver, index).await {
            Ok(Some(job)) => {
                println!("Extracted {}/{}: {}", index + 1, count, job.title);
                jobs.push(job);
            }
            Ok(None) => println!("Skipping card {} with unresolved title", index + 1),
            Err(e) => {
                eprintln!("Failed to process card {}: {:#}", index + 1, e);
                break;
            }
        }
    }
    jobs
}

async fn extract_job(driver: &WebDriver, index: usize) -> Result<Option<RawJob>> {
    // Card handles go stale across detail navigation, re-query every round.
    let cards = driver.find_all(By::Css(JOB_CARD)).await?;
    if index >= cards.len() {
        bail!(
            "card {} missing after list re-render ({} present)",
            index + 1,
            cards.len()
        );
    }
    let card = &cards[index];

    let mut job = RawJob {
        title: UNRESOLVED_TITLE.to_string(),
        scraped_at: Local::now().to_rfc3339(),
        ..Default::default()
    };

    // List-view previews; the detail view overwrites them when it renders.
    if let Some(title) = child_text(card, CARD_TITLE).await {
        if !title.is_empty() {
            job.title = title;
        }
    }
    if let Some(company) = child_text(card, CARD_COMPANY).await {
        job.company = company;
    }

    card.scroll_into_view().await.ok();
    let clicked = card.click().await.is_ok();

    let detail_rendered = clicked
        && driver
            .query(By::Css(DETAIL_VIEW))
            .wait(
                Duration::from_secs(DETAIL_WAIT_SECS),
                Duration::from_millis(500),
            )
            .first()
            .await
            .is_ok();

    if detail_rendered {
        tokio::time::sleep(Duration::from_millis(RENDER_PAUSE_MILLIS)).await;

        if let Ok(url) = driver.current_url().await {
            job.job_url = url.to_string();
        }
        if let Ok(source) = driver.source().await {
            apply_detail_sections(&source, &mut job);
        }

        navigate_back(driver).await;
    } else {
        eprintln!("Detail view never rendered for card {}", index + 1);
    }

    if job.title == UNRESOLVED_TITLE {
        return Ok(None);
    }
    Ok(Some(job))
}

async fn child_text(card: &WebElement, selector: &str) -> Option<String> {
    let element = card.find(By::Css(selector)).await.ok()?;
    let text = element.text().await.ok()?;
    Some(text.trim().to_string())
}

/// Reads the optional detail sections out of the captured page source. Each
/// section that fails to match leaves its field untouched.
fn apply_detail_sections(html: &str, job: &mut RawJob) {
    let document = Html::parse_document(html);

    if let Some(title) = select_text(&document, DETAIL_TITLE) {
        if !title.is_empty() {
            job.title = title;
        }
    }
    if let Some(company) = select_text(&document, DETAIL_COMPANY) {
        if !company.is_empty() {
            job.company = company;
        }
    }
    if let Some(location) = select_text(&document, DETAIL_LOCATION) {
        job.location = location;
    }
    job.description = select_all_text(&document, DETAIL_DESCRIPTION).join("\n");
    job.requirements = select_all_text(&document, DETAIL_REQUIREMENTS);
    job.benefits = select_all_text(&document, DETAIL_BENEFITS);
    if let Some(application) = select_text(&document, DETAIL_APPLICATION) {
        job.application_method = application;
    }
    if let Some(contact) = select_text(&document, DETAIL_CONTACT) {
        job.contact_info = contact;
    }
    if let Some(posted) = select_text(&document, DETAIL_POSTED) {
        job.posted_date = posted;
    }
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;
    Some(element.text().collect::<Vec<_>>().join(" ").trim().to_string())
}

fn select_all_text(document: &Html, selector: &str) -> Vec<String> {
    match Selector::parse(selector) {
        Ok(selector) => document
            .select(&selector)
            .map(|element| element.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|text| !text.is_empty())
            .collect(),
        Err(_) => vec![],
    }
}

/// Ordered back-navigation strategies, tried until one both succeeds and
/// brings the results list back.
#[derive(Debug, Clone, Copy)]
enum BackStrategy {
    BackButton,
    CloseButton,
    HistoryBack,
    Reload,
}

const BACK_STRATEGIES: &[BackStrategy] = &[
    BackStrategy::BackButton,
    BackStrategy::CloseButton,
    BackStrategy::HistoryBack,
    BackStrategy::Reload,
];

async fn navigate_back(driver: &WebDriver) {
    for strategy in BACK_STRATEGIES {
        if !try_back(driver, *strategy).await {
            continue;
        }
        let list_restored = driver
            .query(By::Css(JOB_CARD))
            .wait(
                Duration::from_secs(DETAIL_WAIT_SECS),
                Duration::from_millis(500),
            )
            .first()
            .await
            .is_ok();
        if list_restored {
            return;
        }
    }
    eprintln!("Could not return to the results list");
}

async fn try_back(driver: &WebDriver, strategy: BackStrategy) -> bool {
    match strategy {
        BackStrategy::BackButton => click_first(driver, BACK_BUTTON).await,
        BackStrategy::CloseButton => click_first(driver, CLOSE_BUTTON).await,
        BackStrategy::HistoryBack => driver.back().await.is_ok(),
        BackStrategy::Reload => driver.goto(SEARCH_URL).await.is_ok(),
    }
}

async fn click_first(driver: &WebDriver, selector: &str) -> bool {
    match driver.find_all(By::Css(selector)).await {
        Ok(elements) => match elements.into_iter().next() {
            Some(element) => element.click().await.is_ok(),
            None => false,
        },
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_HTML: &str = r#"
        <html><body>
        <div class="job-detail">
            <h1>Voznik tovornega vozila</h1>
            <div class="employer-name">Prevozi Novak d.o.o.</div>
            <div class="job-location">Ljubljana</div>
            <div class="description"><p>Vožnja po Sloveniji in EU.</p><p>Delo v dveh izmenah.</p></div>
            <div class="requirements"><ul><li>Vozniški izpit C</li><li>Koda 95</li></ul></div>
            <div class="benefits"><ul><li>Regres</li></ul></div>
            <div class="application-method">Prijava preko portala</div>
            <div class="contact-info">kadri@prevozi-novak.si</div>
            <div class="posted-date">07.08.2026</div>
        </div>
        </body></html>
    "#;

    #[test]
    fn fills_all_sections_from_detail_html() {
        let mut job = RawJob {
            title: UNRESOLVED_TITLE.to_string(),
            ..Default::default()
        };
        apply_detail_sections(DETAIL_HTML, &mut job);

        assert_eq!(job.title, "Voznik tovornega vozila");
        assert_eq!(job.company, "Prevozi Novak d.o.o.");
        assert_eq!(job.location, "Ljubljana");
        assert!(job.description.contains("Vožnja po Sloveniji"));
        assert!(job.description.contains("Delo v dveh izmenah"));
        assert_eq!(job.requirements, vec!["Vozniški izpit C", "Koda 95"]);
        assert_eq!(job.benefits, vec!["Regres"]);
        assert_eq!(job.application_method, "Prijava preko portala");
        assert_eq!(job.contact_info, "kadri@prevozi-novak.si");
        assert_eq!(job.posted_date, "07.08.2026");
    }

    #[test]
    fn missing_sections_leave_fields_empty_without_aborting() {
        let html = r#"<div class="job-detail"><h1>Kuhar</h1></div>"#;
        let mut job = RawJob {
            title: UNRESOLVED_TITLE.to_string(),
            company: "Preview d.o.o.".to_string(),
            ..Default::default()
        };
        apply_detail_sections(html, &mut job);

        assert_eq!(job.title, "Kuhar");
        // Preview survives when the detail view has no company block.
        assert_eq!(job.company, "Preview d.o.o.");
        assert!(job.description.is_empty());
        assert!(job.requirements.is_empty());
        assert!(job.benefits.is_empty());
    }

    #[test]
    fn empty_detail_title_does_not_clobber_preview() {
        let html = r#"<div class="job-detail"><h1>  </h1></div>"#;
        let mut job = RawJob {
            title: "Natakar".to_string(),
            ..Default::default()
        };
        apply_detail_sections(html, &mut job);
        assert_eq!(job.title, "Natakar");
    }
}
