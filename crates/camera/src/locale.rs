use anyhow::Context;
use cs_skill::parse_locale_lines;
use rust_embed::RustEmbed;

const FALLBACK_LANG: &str = "en-us";

#[derive(RustEmbed)]
#[folder = "locale/"]
struct Locale;

/// Loads the entries of a locale resource, falling back to English when the
/// requested language doesn't have it.
pub fn resource(lang: &str, name: &str) -> anyhow::Result<Vec<String>> {
    let file = match Locale::get(&format!("{}/{}", lang.to_lowercase(), name)) {
        Some(file) => file,
        None => {
            if lang != FALLBACK_LANG {
                warn!("no {} resource for {}, using {}", name, lang, FALLBACK_LANG);
            }
            Locale::get(&format!("{}/{}", FALLBACK_LANG, name))
                .with_context(|| format!("missing locale resource {}", name))?
        }
    };

    let text = std::str::from_utf8(&file.data)
        .with_context(|| format!("locale resource {} is not utf-8", name))?;

    Ok(parse_locale_lines(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_english_intents() {
        let samples = resource("en-us", "OpenCamera.intent").unwrap();

        assert!(samples.iter().any(|s| s == "open camera"));
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let lines = resource("xx-yy", "acknowledge.dialog").unwrap();

        assert_eq!(lines, resource("en-us", "acknowledge.dialog").unwrap());
    }

    #[test]
    fn language_tag_is_case_insensitive() {
        assert!(resource("EN-US", "CaptureSingleShot.intent").is_ok());
    }

    #[test]
    fn missing_resource_is_an_error() {
        assert!(resource("en-us", "Nope.intent").is_err());
    }
}
