pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Removes executable scripts and HTML imports so serialization cannot
/// trigger further loading or execution.
pub const STRIP_ACTIVE_CONTENT: &str = r#"(function(){const nodes=document.querySelectorAll('script:not([type]),script[type*="javascript"],link[rel="import"]');const count=nodes.length;for(const el of nodes){el.remove()}return count})()"#;

pub const SERIALIZE_DOCUMENT: &str = "document.firstElementChild.outerHTML";

/// Reads the page-declared status override, if any.
pub const STATUS_OVERRIDE_LOOKUP: &str = r#"(function(){const meta=document.querySelector('meta[name="render:status_code"]');return meta?meta.getAttribute('content'):null})()"#;

/// Marker pages can check to detect the pipeline and skip analytics beacons.
pub const PRERENDER_MARKER: &str = "window.__prerendered=true";

/// Ensures exactly one base element resolving relative resources against the
/// request origin. A root-relative href on an existing base is rewritten;
/// an absolute one is left alone.
pub fn inject_base_href(origin: &str) -> String {
    let escaped = escape_literal(origin);
    format!(
        r#"(function(){{const origin='{}';const existing=document.head.querySelectorAll('base');if(existing.length){{const href=existing[0].getAttribute('href')||'';if(href.startsWith('/')){{existing[0].setAttribute('href',origin+href)}}return 'patched'}}const base=document.createElement('base');base.setAttribute('href',origin);document.head.insertAdjacentElement('afterbegin',base);return 'inserted'}})()"#,
        escaped
    )
}

pub fn ready_flag_check(var_name: &str) -> String {
    format!("window['{}']===true", escape_literal(var_name))
}

pub fn advance_frame(func_name: &str) -> String {
    format!("window['{}']()", escape_literal(func_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("cxReady"), "cxReady");
        assert_eq!(escape_literal("it's"), "it\\'s");
        assert_eq!(escape_literal("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_strip_active_content_selectors() {
        assert!(STRIP_ACTIVE_CONTENT.contains("script:not([type])"));
        assert!(STRIP_ACTIVE_CONTENT.contains(r#"script[type*="javascript"]"#));
        assert!(STRIP_ACTIVE_CONTENT.contains(r#"link[rel="import"]"#));
    }

    #[test]
    fn test_status_override_meta_name() {
        assert!(STATUS_OVERRIDE_LOOKUP.contains(r#"meta[name="render:status_code"]"#));
    }

    #[test]
    fn test_inject_base_href() {
        let script = inject_base_href("https://example.com");
        assert!(script.contains("const origin='https://example.com'"));
        assert!(script.contains("startsWith('/')"));
        assert!(script.contains("insertAdjacentElement('afterbegin',base)"));
    }

    #[test]
    fn test_inject_base_href_escapes_origin() {
        let script = inject_base_href("https://ex'ample.com");
        assert!(script.contains("https://ex\\'ample.com"));
    }

    #[test]
    fn test_ready_flag_check() {
        assert_eq!(ready_flag_check("cxReady"), "window['cxReady']===true");
    }

    #[test]
    fn test_advance_frame() {
        assert_eq!(advance_frame("nextFrame"), "window['nextFrame']()");
    }
}
