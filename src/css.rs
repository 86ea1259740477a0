//! Pure helpers for turning raw `@font-face` descriptor text into rules

use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::model::FontFaceRule;
use crate::scripts::RawFontFaceRule;

/// Collect the targets of every `url(...)` in a `src` descriptor, in order.
///
/// Walks `cssparser` tokens, so escapes inside quoted URLs are decoded and
/// text inside other functions (`local("...")`, `format(...)`) is never
/// mistaken for a URL. Bad or empty URLs are skipped.
pub fn extract_font_urls(src: &str) -> Vec<String> {
    let mut input = ParserInput::new(src);
    let mut parser = Parser::new(&mut input);
    let mut urls = Vec::new();

    loop {
        let token = match parser.next() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };
        let url = match token {
            Token::UnquotedUrl(ref value) => Some(value.as_ref().to_string()),
            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                url_function_arg(&mut parser)
            }
            _ => None,
        };
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            urls.push(url);
        }
    }

    urls
}

// Quoted argument of a `url(` function token; the block is consumed either way.
fn url_function_arg<'i>(parser: &mut Parser<'i, '_>) -> Option<String> {
    parser
        .parse_nested_block(|nested| {
            let mut arg = None;
            while let Ok(token) = nested.next() {
                if let (None, Token::QuotedString(s)) = (&arg, token) {
                    arg = Some(s.as_ref().to_string());
                }
            }
            Ok::<_, ParseError<'i, ()>>(arg)
        })
        .ok()
        .flatten()
}

/// Resolve `raw` against `base`, the way an anchor's `href` would.
///
/// Returns `None` when `raw` is relative and there is no usable base, or
/// when joining fails.
pub fn resolve_url(base: Option<&str>, raw: &str) -> Option<String> {
    if let Ok(abs) = url::Url::parse(raw) {
        return Some(abs.to_string());
    }
    let base = url::Url::parse(base?).ok()?;
    base.join(raw).ok().map(|u| u.to_string())
}

/// Strip every single and double quote from a family name.
pub fn unquote_family(family: &str) -> String {
    family.chars().filter(|c| *c != '"' && *c != '\'').collect::<String>().trim().to_string()
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Apply descriptor defaults and resolve sources for one raw rule.
pub fn normalize_rule(raw: &RawFontFaceRule, base: Option<&str>) -> FontFaceRule {
    let sources = extract_font_urls(&raw.src)
        .into_iter()
        .filter_map(|u| resolve_url(base, &u))
        .collect();

    FontFaceRule {
        family: unquote_family(&raw.family),
        style: or_default(&raw.style, "normal"),
        weight: or_default(&raw.weight, "normal"),
        stretch: or_default(&raw.stretch, "normal"),
        display: or_default(&raw.display, "auto"),
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_and_unquoted_urls() {
        let src = r#"local("Roboto"), url("a.woff2") format("woff2"), url('b.woff'), URL( c.ttf )"#;
        assert_eq!(extract_font_urls(src), vec!["a.woff2", "b.woff", "c.ttf"]);
    }

    #[test]
    fn local_only_src_has_no_urls() {
        assert!(extract_font_urls(r#"local("Arial")"#).is_empty());
        assert!(extract_font_urls("").is_empty());
    }

    #[test]
    fn escaped_quote_stays_in_url() {
        assert_eq!(
            extract_font_urls(r#"url("fonts/a\"b.woff2") format("woff2")"#),
            vec!["fonts/a\"b.woff2"]
        );
    }

    #[test]
    fn url_text_inside_local_name_is_not_a_source() {
        assert_eq!(
            extract_font_urls(r#"local("Foo url(x.woff)"), url("real.woff2")"#),
            vec!["real.woff2"]
        );
    }

    #[test]
    fn bad_and_empty_urls_are_skipped() {
        assert_eq!(extract_font_urls(r#"url(a b.woff), url(""), url(ok.woff)"#), vec!["ok.woff"]);
    }

    #[test]
    fn resolves_relative_against_sheet() {
        assert_eq!(
            resolve_url(Some("https://cdn.example/css/site.css"), "../fonts/r.woff2").as_deref(),
            Some("https://cdn.example/fonts/r.woff2")
        );
        assert_eq!(
            resolve_url(None, "https://x/roboto.woff2").as_deref(),
            Some("https://x/roboto.woff2")
        );
        assert_eq!(resolve_url(None, "r.woff2"), None);
    }

    #[test]
    fn data_urls_pass_through() {
        let resolved = resolve_url(Some("https://x/"), "data:font/woff2;base64,AAAA");
        assert_eq!(resolved.as_deref(), Some("data:font/woff2;base64,AAAA"));
    }

    #[test]
    fn normalize_applies_defaults() {
        let raw = RawFontFaceRule {
            family: "\"Open Sans\"".into(),
            src: "url(\"/f/os.woff2\")".into(),
            ..Default::default()
        };
        let rule = normalize_rule(&raw, Some("https://x/index.html"));
        assert_eq!(rule.family, "Open Sans");
        assert_eq!(rule.style, "normal");
        assert_eq!(rule.weight, "normal");
        assert_eq!(rule.stretch, "normal");
        assert_eq!(rule.display, "auto");
        assert_eq!(rule.sources, vec!["https://x/f/os.woff2".to_string()]);
    }

    #[test]
    fn unresolvable_sources_are_dropped() {
        let raw = RawFontFaceRule {
            family: "A".into(),
            src: "url(rel.woff)".into(),
            ..Default::default()
        };
        assert!(normalize_rule(&raw, None).sources.is_empty());
    }
}
