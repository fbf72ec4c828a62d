//! Page wrapper applied to every rendered Markdown page.

use minijinja::{Environment, Value, context};

const INNER_TEMPLATE_NAME: &str = "inner.html";
const INNER_TEMPLATE: &str = include_str!("../templates/inner.html");

/// Template wrapping a rendered page body before it is stored.
pub struct PageTemplate {
    env: Environment<'static>,
}

impl PageTemplate {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INNER_TEMPLATE_NAME, INNER_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Wrap already-rendered HTML. The content is inserted unescaped.
    pub fn render(&self, content: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template(INNER_TEMPLATE_NAME)?
            .render(context! { content => Value::from_safe_string(content.to_owned()) })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_render_wraps_content_unescaped() {
        let template = PageTemplate::new().unwrap();

        let html = template.render("<h1>Title</h1>").unwrap();

        assert_eq!(html, "<div class=\"udocs-content\">\n<h1>Title</h1>\n</div>");
    }
}
