use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

pub const STORAGE_KEY: &str = "fitdash.dashboard.state";
pub const CHANNEL_NAME: &str = "fitdash-state-sync";
pub const WILDCARD: &str = "all";
pub const URL_KEYS: [&str; 6] = ["timeKey", "from", "to", "location", "department", "service"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeKey {
    #[default]
    Today,
    Yesterday,
    Week,
    Mtd,
    Month,
    Ytd,
    Year,
}

impl TimeKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "yesterday" => Some(Self::Yesterday),
            "week" => Some(Self::Week),
            "mtd" => Some(Self::Mtd),
            "month" => Some(Self::Month),
            "ytd" => Some(Self::Ytd),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Week => "week",
            Self::Mtd => "mtd",
            Self::Month => "month",
            Self::Ytd => "ytd",
            Self::Year => "year",
        }
    }

    pub fn range_at(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Today => (today, today),
            Self::Yesterday => {
                let yesterday = today - Duration::days(1);
                (yesterday, yesterday)
            }
            Self::Week => (week_start(today), today),
            Self::Mtd => (month_start(today), today),
            Self::Month => (month_start(today), month_end(today)),
            Self::Ytd => (year_start(today), today),
            Self::Year => (year_start(today), year_end(today)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardState {
    pub time_key: TimeKey,
    pub from: String,
    pub to: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: String,
    pub department: String,
    pub service: String,
    pub search: String,
    pub page: u32,
    pub page_size: u32,
    pub sort_by: String,
    pub sort_order: String,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            time_key: TimeKey::Today,
            from: String::new(),
            to: String::new(),
            start_date: None,
            end_date: None,
            location: WILDCARD.to_string(),
            department: WILDCARD.to_string(),
            service: WILDCARD.to_string(),
            search: String::new(),
            page: 1,
            page_size: 20,
            sort_by: "date".to_string(),
            sort_order: "desc".to_string(),
        }
    }
}

impl DashboardState {
    pub fn recompute_dates(&mut self) {
        self.recompute_dates_at(Local::now().date_naive());
    }

    // A parseable from/to pair overrides whatever timeKey would derive.
    pub fn recompute_dates_at(&mut self, today: NaiveDate) {
        let (start, end) = match (parse_date(&self.from), parse_date(&self.to)) {
            (Some(from), Some(to)) => (from, to),
            _ => self.time_key.range_at(today),
        };
        self.start_date = Some(start);
        self.end_date = Some(end);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_key: Option<TimeKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn merge_into(&self, state: &mut DashboardState) {
        if let Some(time_key) = self.time_key {
            state.time_key = time_key;
        }
        if let Some(from) = &self.from {
            state.from = from.clone();
        }
        if let Some(to) = &self.to {
            state.to = to.clone();
        }
        if let Some(location) = &self.location {
            state.location = location.clone();
        }
        if let Some(department) = &self.department {
            state.department = department.clone();
        }
        if let Some(service) = &self.service {
            state.service = service.clone();
        }
        if let Some(search) = &self.search {
            state.search = search.clone();
        }
        if let Some(page) = self.page {
            state.page = page;
        }
        if let Some(page_size) = self.page_size {
            state.page_size = page_size;
        }
        if let Some(sort_by) = &self.sort_by {
            state.sort_by = sort_by.clone();
        }
        if let Some(sort_order) = &self.sort_order {
            state.sort_order = sort_order.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateBroadcast {
    pub origin: u64,
    pub state: DashboardState,
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

fn month_end(date: NaiveDate) -> NaiveDate {
    let next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    next.map(|first| first - Duration::days(1)).unwrap_or(date)
}

fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

fn year_end(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_range_starts_on_monday() {
        let thursday = date(2026, 1, 8);
        let (start, end) = TimeKey::Week.range_at(thursday);
        assert_eq!(start, date(2026, 1, 5));
        assert_eq!(end, thursday);
    }

    #[test]
    fn month_range_covers_whole_calendar_month() {
        let (start, end) = TimeKey::Month.range_at(date(2026, 2, 10));
        assert_eq!(start, date(2026, 2, 1));
        assert_eq!(end, date(2026, 2, 28));

        let (start, end) = TimeKey::Month.range_at(date(2025, 12, 3));
        assert_eq!(start, date(2025, 12, 1));
        assert_eq!(end, date(2025, 12, 31));
    }

    #[test]
    fn mtd_and_ytd_end_today() {
        let today = date(2026, 3, 14);
        assert_eq!(TimeKey::Mtd.range_at(today), (date(2026, 3, 1), today));
        assert_eq!(TimeKey::Ytd.range_at(today), (date(2026, 1, 1), today));
        assert_eq!(
            TimeKey::Year.range_at(today),
            (date(2026, 1, 1), date(2026, 12, 31))
        );
    }

    #[test]
    fn custom_from_to_overrides_time_key() {
        let mut state = DashboardState {
            time_key: TimeKey::Week,
            from: "2026-01-01".to_string(),
            to: "2026-01-15".to_string(),
            ..DashboardState::default()
        };
        state.recompute_dates_at(date(2026, 3, 14));
        assert_eq!(state.start_date, Some(date(2026, 1, 1)));
        assert_eq!(state.end_date, Some(date(2026, 1, 15)));
    }

    #[test]
    fn unparseable_override_falls_back_to_time_key() {
        let mut state = DashboardState {
            from: "not-a-date".to_string(),
            to: "2026-01-15".to_string(),
            ..DashboardState::default()
        };
        state.recompute_dates_at(date(2026, 3, 14));
        assert_eq!(state.start_date, Some(date(2026, 3, 14)));
        assert_eq!(state.end_date, Some(date(2026, 3, 14)));
    }

    #[test]
    fn patch_merge_keeps_unset_fields() {
        let mut state = DashboardState::default();
        let patch = StatePatch {
            location: Some("giang-vo".to_string()),
            page: Some(3),
            ..StatePatch::default()
        };
        patch.merge_into(&mut state);
        assert_eq!(state.location, "giang-vo");
        assert_eq!(state.page, 3);
        assert_eq!(state.department, WILDCARD);
        assert_eq!(state.page_size, 20);
    }

    #[test]
    fn state_serializes_with_wire_names() {
        let state = DashboardState::default();
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["timeKey"], "today");
        assert_eq!(value["pageSize"], 20);
        assert_eq!(value["sortOrder"], "desc");
        assert!(value["startDate"].is_null());
    }
}
