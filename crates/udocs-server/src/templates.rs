//! Page templates.
//!
//! Stored pages are fragments; they are wrapped in the site layout together
//! with the sidebar at request time.

use minijinja::{Environment, Value, context};
use udocs_site::Sidebar;
use udocs_storage::QueryResult;

use crate::SiteParams;

/// The server's compiled templates.
pub(crate) struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Compile the embedded templates with `site` as a global.
    pub(crate) fn new(site: &SiteParams) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("base.html", include_str!("../templates/base.html"))?;
        env.add_template("document.html", include_str!("../templates/document.html"))?;
        env.add_template("search.html", include_str!("../templates/search.html"))?;
        env.add_template("home.html", include_str!("../templates/home.html"))?;
        env.add_global("site", Value::from_serialize(site));
        Ok(Self { env })
    }

    /// Wrap a stored page in the site layout.
    pub(crate) fn document(
        &self,
        route: &str,
        sidebar: &Sidebar,
        content: &str,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template("document.html")?.render(context! {
            route,
            sidebar => sidebar.summaries(),
            content => Value::from_safe_string(content.to_owned()),
        })
    }

    /// Render search results.
    pub(crate) fn search(
        &self,
        sidebar: &Sidebar,
        query_result: &QueryResult,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template("search.html")?.render(context! {
            sidebar => sidebar.summaries(),
            query_result,
        })
    }

    /// Render the list of published guides.
    pub(crate) fn home(&self, sidebar: &Sidebar) -> Result<String, minijinja::Error> {
        self.env
            .get_template("home.html")?
            .render(context! { sidebar => sidebar.summaries() })
    }
}

#[cfg(test)]
mod tests {
    use udocs_site::{Summary, parse_summary};

    use super::*;

    fn templates() -> Templates {
        Templates::new(&SiteParams {
            organization: "Acme".to_owned(),
            email: "docs@acme.test".to_owned(),
            ..SiteParams::default()
        })
        .unwrap()
    }

    fn sidebar() -> Sidebar {
        let guide = parse_summary(
            "guide",
            b"# The Guide\n* [Intro](README.md)\n\t* [Setup](setup.md)\n",
        )
        .unwrap();
        Sidebar::from(vec![guide, Summary::empty("retired")])
    }

    #[test]
    fn test_document_embeds_content_and_sidebar() {
        let html = templates()
            .document("guide", &sidebar(), "<h1>Intro</h1>")
            .unwrap();

        assert!(html.contains("<h1>Intro</h1>"));
        assert!(html.contains(r#"<a class="udocs-guide" href="/guide">The Guide</a>"#));
        assert!(html.contains(r#"setup.html">Setup</a>"#));
        assert!(html.contains(r#"<section class="active">"#));
        assert!(!html.contains("/retired"));
        assert!(html.contains("mailto:docs@acme.test"));
        assert!(html.contains("--udocs-primary: #5ca616"));
    }

    #[test]
    fn test_search_escapes_phrase() {
        let result = QueryResult {
            phrase: "<script>".to_owned(),
            ..QueryResult::default()
        };

        let html = templates().search(&sidebar(), &result).unwrap();

        assert!(html.contains("0 results for \"&lt;script&gt;\""));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_home_lists_guides() {
        let html = templates().home(&sidebar()).unwrap();

        assert!(html.contains(r#"<li><a href="/guide">The Guide</a></li>"#));
        assert!(!html.contains("No guides"));

        let empty = templates().home(&Sidebar::default()).unwrap();
        assert!(empty.contains("No guides have been published yet."));
    }
}
