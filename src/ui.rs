use crate::components::{Component, ComponentRegistry, PageShell, Props};
use crate::models::{DashboardState, WILDCARD};
use crate::query;
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct PageDef {
    pub path: &'static str,
    pub title: &'static str,
    pub blurb: &'static str,
}

pub const PAGES: [PageDef; 5] = [
    PageDef {
        path: "/",
        title: "Overview",
        blurb: "Key numbers across every club.",
    },
    PageDef {
        path: "/revenue",
        title: "Revenue",
        blurb: "Billing and membership revenue.",
    },
    PageDef {
        path: "/bookings",
        title: "Bookings",
        blurb: "Class and court reservations.",
    },
    PageDef {
        path: "/checkins",
        title: "Check-ins",
        blurb: "Door and class attendance.",
    },
    PageDef {
        path: "/visitors",
        title: "Visitors",
        blurb: "Walk-ins and trial passes.",
    },
];

pub fn default_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register("filter-bar", Component::new(render_filter_bar));
    registry.register("page-content", Component::new(render_page_content));
    registry
}

pub fn render_dashboard(page: &PageDef, state: &DashboardState, registry: &ComponentRegistry) -> String {
    let mut shell = PageShell::new(SHELL_HTML);
    shell.set_slot("title", page.title);
    shell.set_slot("nav", render_nav(page.path, state));

    let mut props = props_from_state(state);
    props.insert("title".to_string(), Value::String(page.title.to_string()));
    props.insert("blurb".to_string(), Value::String(page.blurb.to_string()));
    registry.mount("filter-bar", &mut shell, "filters", &props);
    registry.mount("page-content", &mut shell, "content", &props);

    shell.render()
}

pub fn props_from_state(state: &DashboardState) -> Props {
    match serde_json::to_value(state) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => Props::new(),
    }
}

fn render_nav(active_path: &str, state: &DashboardState) -> String {
    let mut links = String::new();
    for page in PAGES {
        let href = query::navigation_url(page.path, state).unwrap_or_else(|_| page.path.to_string());
        let class = if page.path == active_path { " class=\"active\"" } else { "" };
        links.push_str(&format!("<a href=\"{href}\"{class}>{}</a>", page.title));
    }
    links
}

fn prop_str<'a>(props: &'a Props, key: &str) -> &'a str {
    props.get(key).and_then(Value::as_str).unwrap_or("")
}

fn filter_label(value: &str) -> &str {
    if value.is_empty() || value == WILDCARD { "all" } else { value }
}

fn render_filter_bar(props: &Props) -> Result<String, crate::components::ComponentError> {
    let start = props
        .get("startDate")
        .and_then(Value::as_str)
        .unwrap_or("\u{2013}");
    let end = props
        .get("endDate")
        .and_then(Value::as_str)
        .unwrap_or("\u{2013}");

    Ok(format!(
        concat!(
            "<section class=\"filters\">",
            "<span class=\"chip\" data-filter=\"timeKey\">{time_key}</span>",
            "<span class=\"chip\" data-filter=\"range\">{start} to {end}</span>",
            "<span class=\"chip\" data-filter=\"location\">location: {location}</span>",
            "<span class=\"chip\" data-filter=\"department\">department: {department}</span>",
            "<span class=\"chip\" data-filter=\"service\">service: {service}</span>",
            "</section>"
        ),
        time_key = prop_str(props, "timeKey"),
        start = start,
        end = end,
        location = filter_label(prop_str(props, "location")),
        department = filter_label(prop_str(props, "department")),
        service = filter_label(prop_str(props, "service")),
    ))
}

fn render_page_content(props: &Props) -> Result<String, crate::components::ComponentError> {
    let page = props.get("page").and_then(Value::as_u64).unwrap_or(1);
    let page_size = props.get("pageSize").and_then(Value::as_u64).unwrap_or(20);

    Ok(format!(
        concat!(
            "<section class=\"content\">",
            "<h2>{title}</h2>",
            "<p class=\"blurb\">{blurb}</p>",
            "<p class=\"scope\">Showing page {page} ({page_size} per page), sorted by {sort_by} {sort_order}.</p>",
            "</section>"
        ),
        title = prop_str(props, "title"),
        blurb = prop_str(props, "blurb"),
        page = page,
        page_size = page_size,
        sort_by = prop_str(props, "sortBy"),
        sort_order = prop_str(props, "sortOrder"),
    ))
}

const SHELL_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{title}} - FitDash</title>
  <style>
    :root {
      --ink: #22313f;
      --accent: #ff6b4a;
      --muted: #7a746d;
    }

    body {
      margin: 0;
      min-height: 100vh;
      font-family: "Trebuchet MS", sans-serif;
      color: var(--ink);
      background: #f8f3e6;
      padding: 32px 18px;
    }

    .app {
      width: min(860px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 20px;
    }

    nav a {
      margin-right: 12px;
      color: var(--muted);
      text-decoration: none;
      font-weight: 600;
    }

    nav a.active {
      color: var(--accent);
    }

    .filters {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
    }

    .chip {
      background: white;
      border: 1px solid rgba(34, 49, 63, 0.12);
      border-radius: 999px;
      padding: 6px 12px;
      font-size: 0.85rem;
    }

    .content {
      background: white;
      border-radius: 16px;
      padding: 20px;
      border: 1px solid rgba(34, 49, 63, 0.08);
    }

    .blurb, .scope {
      color: var(--muted);
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>FitDash</h1>
      <nav>{{nav}}</nav>
    </header>
    {{filters}}
    {{content}}
  </main>
</body>
</html>
"#;
