//! Embedded static resources for the built-in dev server.
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Dev server templates (doc.html, reload.js)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{RELOAD_JS, ReloadVars};
//!
//! let js = RELOAD_JS.render(&ReloadVars::default());
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};
    use crate::serve::revision::{RELOAD_SCRIPT_PATH, REVISION_PATH, STREAM_PATH};

    /// Fallback polling interval of the reload client.
    pub const POLL_INTERVAL_MS: u32 = 30_000;

    /// Variables for reload.js.
    pub struct ReloadVars {
        pub revision_path: &'static str,
        pub stream_path: &'static str,
        pub poll_ms: u32,
    }

    impl Default for ReloadVars {
        fn default() -> Self {
            Self {
                revision_path: REVISION_PATH,
                stream_path: STREAM_PATH,
                poll_ms: POLL_INTERVAL_MS,
            }
        }
    }

    impl TemplateVars for ReloadVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__REVISION_PATH__", self.revision_path)
                .replace("__STREAM_PATH__", self.stream_path)
                .replace("__POLL_MS__", &self.poll_ms.to_string())
        }
    }

    /// Variables for doc.html.
    pub struct DocPageVars {
        pub slug: String,
    }

    impl TemplateVars for DocPageVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__SLUG__", &html_escape(&self.slug))
                .replace("__RELOAD_SCRIPT__", RELOAD_SCRIPT_PATH)
        }
    }

    /// Browser client of the revision channel.
    pub const RELOAD_JS: Template<ReloadVars> = Template::new(include_str!("serve/reload.js"));

    /// Placeholder page for an existing doc.
    pub const DOC_PAGE_HTML: Template<DocPageVars> = Template::new(include_str!("serve/doc.html"));

    fn html_escape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }

}
