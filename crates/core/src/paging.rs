use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Cards shown per page when neither the request nor the config says otherwise.
pub const CARD_LIMIT: u32 = 6;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Grid,
    Table,
}

impl FromStr for View {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.eq_ignore_ascii_case("grid") {
            Ok(View::Grid)
        } else if raw.eq_ignore_ascii_case("table") {
            Ok(View::Table)
        } else {
            Err(format!("unknown view: {raw}"))
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Grid => f.write_str("grid"),
            View::Table => f.write_str("table"),
        }
    }
}

/// Resolved paging parameters for one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub view: View,
}

impl PageRequest {
    /// Resolves raw query values, falling back where a value is absent or invalid.
    pub fn from_query(
        page: Option<&str>,
        limit: Option<&str>,
        view: Option<&str>,
        default_limit: u32,
        default_view: View,
    ) -> Self {
        Self {
            page: parse_page(page),
            limit: parse_limit(limit, default_limit),
            view: parse_view(view, default_view),
        }
    }

    pub fn offset(&self) -> u64 {
        page_to_offset(self.page, self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: CARD_LIMIT,
            view: View::Grid,
        }
    }
}

pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&page| page >= 1)
        .unwrap_or(1)
}

pub fn parse_limit(raw: Option<&str>, default_limit: u32) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&limit| limit >= 1)
        .unwrap_or(default_limit.max(1))
}

pub fn parse_view(raw: Option<&str>, default_view: View) -> View {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default_view)
}

pub fn page_to_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(limit)
}
