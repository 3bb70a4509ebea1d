//! Search ranking detection for the user's domain.

use super::domain::{normalize_host, same_site};
use crate::model::RankingResult;
use crate::providers::SearchProvider;
use tracing::{debug, info, warn};

/// Results per search page the rank arithmetic assumes.
pub const RESULTS_PER_PAGE: usize = 10;
/// Ranks are reported within the first 100 results.
pub const MAX_PAGES: u32 = 10;

/// Scan up to `max_pages` result pages for `keyword` and return the 1-based
/// position of the first result on the user's site.
///
/// Stops at the first page that contains a match, or at the first empty
/// page. A search error ends detection with "not found".
pub async fn detect_ranking(
    search: &dyn SearchProvider,
    keyword: &str,
    user_url: &str,
    max_pages: u32,
) -> RankingResult {
    if normalize_host(user_url).is_none() {
        warn!(url = user_url, "cannot rank: user URL has no host");
        return RankingResult::not_found();
    }

    let mut scanned = 0usize;
    for page in 1..=max_pages.clamp(1, MAX_PAGES) {
        let mut results = match search.search(keyword, page).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, page, "ranking search failed; treating as not found");
                return RankingResult::not_found();
            }
        };
        if results.is_empty() {
            debug!(page, "no more search results");
            break;
        }
        results.truncate(RESULTS_PER_PAGE);

        if let Some(pos) = results.iter().position(|r| same_site(&r.url, user_url)) {
            let rank = (scanned + pos + 1) as u32;
            let found = results[pos].url.clone();
            info!(rank, url = %found, "found user site in search results");
            return RankingResult {
                rank: Some(rank),
                found_url: Some(found),
            };
        }
        scanned += results.len();
    }

    info!(scanned, "user site not found in search results");
    RankingResult::not_found()
}
