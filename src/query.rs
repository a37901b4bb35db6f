use crate::models::{DashboardState, StatePatch, TimeKey, URL_KEYS, WILDCARD};
use tracing::debug;
use url::Url;

// A whitelisted key is carried in a URL iff its value is non-empty and not
// the wildcard sentinel.
fn whitelist_value(state: &DashboardState, key: &str) -> Option<String> {
    let value = match key {
        "timeKey" => state.time_key.as_str().to_string(),
        "from" => state.from.clone(),
        "to" => state.to.clone(),
        "location" => state.location.clone(),
        "department" => state.department.clone(),
        "service" => state.service.clone(),
        _ => return None,
    };
    if value.is_empty() || value == WILDCARD {
        None
    } else {
        Some(value)
    }
}

pub fn patch_from_query(query: &str) -> StatePatch {
    let mut patch = StatePatch::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "timeKey" => {
                patch.time_key = Some(TimeKey::parse(&value).unwrap_or_else(|| {
                    debug!("unknown timeKey {value:?} in URL, falling back to default");
                    TimeKey::default()
                }));
            }
            "from" => patch.from = Some(value.into_owned()),
            "to" => patch.to = Some(value.into_owned()),
            "location" => patch.location = Some(value.into_owned()),
            "department" => patch.department = Some(value.into_owned()),
            "service" => patch.service = Some(value.into_owned()),
            _ => {}
        }
    }
    patch
}

pub fn query_for_state(state: &DashboardState) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for key in URL_KEYS {
        if let Some(value) = whitelist_value(state, key) {
            serializer.append_pair(key, &value);
        }
    }
    serializer.finish()
}

pub fn apply_to_url(url: &mut Url, state: &DashboardState) {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !URL_KEYS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        for key in URL_KEYS {
            if let Some(value) = whitelist_value(state, key) {
                pairs.append_pair(key, &value);
            }
        }
    }
    if url.query().is_some_and(str::is_empty) {
        url.set_query(None);
    }
}

pub fn strip_whitelisted(url: &mut Url) {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !URL_KEYS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if retained.is_empty() {
        url.set_query(None);
        return;
    }
    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (key, value) in &retained {
        pairs.append_pair(key, value);
    }
}

// Builds the target as an absolute URL against a fixed origin, applies the
// whitelist projection, then relativizes back to path + query.
pub fn navigation_url(target_path: &str, state: &DashboardState) -> Result<String, url::ParseError> {
    let base = Url::parse("http://fitdash.invalid/")?;
    let mut url = base.join(target_path)?;
    apply_to_url(&mut url, state);

    let mut relative = url.path().to_string();
    if let Some(query) = url.query() {
        relative.push('?');
        relative.push_str(query);
    }
    Ok(relative)
}
