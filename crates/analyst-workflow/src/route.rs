//! Routing labels and reply parsing

use analyst_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the supervisor sends the conversation next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    DataAnalyst,
    ChartSpecialist,
    NewsAnalyst,
    ReportWriter,
    Finish,
}

impl Route {
    /// Scan order when a reply names more than one label
    pub const PRIORITY: [Route; 5] = [
        Route::DataAnalyst,
        Route::ChartSpecialist,
        Route::NewsAnalyst,
        Route::ReportWriter,
        Route::Finish,
    ];

    /// Every route that runs a specialist
    pub const SPECIALISTS: [Route; 4] = [
        Route::DataAnalyst,
        Route::ChartSpecialist,
        Route::NewsAnalyst,
        Route::ReportWriter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Route::DataAnalyst => "data_analyst",
            Route::ChartSpecialist => "chart_specialist",
            Route::NewsAnalyst => "news_analyst",
            Route::ReportWriter => "report_writer",
            Route::Finish => "finish",
        }
    }

    pub fn is_finish(self) -> bool {
        self == Route::Finish
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact label match only, case-insensitive
impl FromStr for Route {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_lowercase();
        Route::PRIORITY
            .into_iter()
            .find(|route| route.as_str() == label)
            .ok_or_else(|| Error::ProcessingFailed(format!("Unknown route '{s}'")))
    }
}

/// Map a free-form classification reply onto a route
///
/// The reply is lowercased and trimmed. An exact label wins; otherwise the
/// first label in [`Route::PRIORITY`] that appears anywhere in the reply;
/// otherwise [`Route::Finish`].
pub fn parse_route(reply: &str) -> Route {
    let decision = reply.trim().to_lowercase();
    if let Ok(route) = decision.parse() {
        return route;
    }

    Route::PRIORITY
        .into_iter()
        .find(|route| decision.contains(route.as_str()))
        .unwrap_or(Route::Finish)
}
