//! HTML shells for the dashboard pages.
//!
//! The client bundle renders the actual views; these pages only give the gate
//! something to guard and the bundle somewhere to mount.

use axum::{
    extract::Path,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};

const APP_CSS: &str = r"
:root { --ink: #1d1d28; --muted: #6b6b80; --accent: #ff5a5f; --surface: #f7f7fa; }
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, sans-serif; color: var(--ink); background: var(--surface); }
header { display: flex; align-items: center; justify-content: space-between; padding: 1rem 2rem; background: #fff; border-bottom: 1px solid #e5e5ee; }
nav a { margin-right: 1.25rem; color: var(--muted); text-decoration: none; }
nav a.active { color: var(--accent); font-weight: 600; }
main { max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
form.logout button { border: 0; background: none; color: var(--muted); cursor: pointer; }
.card { background: #fff; border-radius: 8px; padding: 1.5rem; box-shadow: 0 1px 2px rgba(0, 0, 0, 0.06); }
";

/// Dashboard tabs in navigation order.
pub const TABS: [&str; 4] = ["events", "bookings", "payments", "support"];

pub(crate) fn router() -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::temporary("/dashboard") }))
        .route("/login", get(login))
        .route("/register", get(register))
        .route("/dashboard", get(|| async { dashboard_page(TABS[0]) }))
        .route("/dashboard/:tab", get(dashboard_tab))
        .route("/assets/app.css", get(app_css))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Hostdash</title>
<link rel="stylesheet" href="/assets/app.css">
</head>
<body>
{body}
</body>
</html>
"#
    ))
}

async fn login() -> Html<String> {
    layout(
        "Sign in",
        r#"<main><section class="card" id="login" data-api="/api/login"></section></main>"#,
    )
}

async fn register() -> Html<String> {
    layout(
        "Create your host account",
        r#"<main><section class="card" id="register" data-api="/api/register-host"></section></main>"#,
    )
}

fn dashboard_page(active: &str) -> Html<String> {
    let nav: String = TABS
        .iter()
        .map(|tab| {
            let class = if *tab == active { r#" class="active""# } else { "" };
            format!(r#"<a href="/dashboard/{tab}"{class}>{}</a>"#, title_case(tab))
        })
        .collect();
    let body = format!(
        r#"<header><nav>{nav}</nav><form class="logout" method="post" action="/api/logout"><button type="submit">Sign out</button></form></header>
<main><section class="card" id="tab-{active}" data-tab="{active}"></section></main>"#
    );
    layout(&title_case(active), &body)
}

async fn dashboard_tab(Path(tab): Path<String>) -> Response {
    match TABS.iter().find(|t| **t == tab) {
        Some(tab) => dashboard_page(tab).into_response(),
        None => (StatusCode::NOT_FOUND, layout("Not found", "<main>Not found</main>")).into_response(),
    }
}

async fn app_css() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/css; charset=utf-8")], APP_CSS)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_marks_active_tab() {
        let Html(page) = dashboard_page("payments");
        assert!(page.contains(r#"<a href="/dashboard/payments" class="active">Payments</a>"#));
        assert!(page.contains(r#"<a href="/dashboard/events">Events</a>"#));
        assert!(page.contains("<title>Payments | Hostdash</title>"));
    }

    #[tokio::test]
    async fn unknown_tab_is_not_found() {
        let response = dashboard_tab(Path("settings".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
