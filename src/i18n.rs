//! Internationalization (i18n) module for HeritagePromo.
//!
//! Uses a simple key→string HashMap loaded from embedded translation data.
//! The `t!("key")` macro looks up the current language, falling back to Korean.
//! Language can be switched at runtime via `set_language()`.

use std::collections::HashMap;
use std::sync::Mutex;

/// Global translation state.
static I18N: Mutex<Option<I18nState>> = Mutex::new(None);

/// Language used when nothing else matches (the classroom default).
pub const DEFAULT_LANGUAGE: &str = "ko";

struct I18nState {
    current_lang: String,
    /// lang_code → (key → translated_string)
    translations: HashMap<String, HashMap<String, String>>,
}

impl I18nState {
    fn embedded() -> Self {
        let mut translations = HashMap::new();
        translations.insert("ko".to_string(), parse_translations(include_str!("../locales/ko.txt")));
        translations.insert("en".to_string(), parse_translations(include_str!("../locales/en.txt")));
        Self { current_lang: DEFAULT_LANGUAGE.to_string(), translations }
    }
}

/// Supported languages: (code, native_name)
pub const LANGUAGES: &[(&str, &str)] = &[("ko", "한국어"), ("en", "English")];

/// Initialize the i18n system with embedded translations.
/// Lookups before `init` initialize lazily with the default language.
pub fn init() {
    if let Ok(mut guard) = I18N.lock() {
        *guard = Some(I18nState::embedded());
    }
}

/// Set the active language. Unknown codes fall back to Korean.
pub fn set_language(code: &str) {
    if let Ok(mut guard) = I18N.lock() {
        let state = guard.get_or_insert_with(I18nState::embedded);
        if state.translations.contains_key(code) {
            state.current_lang = code.to_string();
        } else {
            state.current_lang = DEFAULT_LANGUAGE.to_string();
        }
    }
}

/// Get the current language code.
pub fn current_language() -> String {
    if let Ok(guard) = I18N.lock()
        && let Some(ref state) = *guard
    {
        return state.current_lang.clone();
    }
    DEFAULT_LANGUAGE.to_string()
}

/// Look up a translation key in the current language, then Korean, then
/// return the key itself.
pub fn translate(key: &str) -> String {
    if let Ok(mut guard) = I18N.lock() {
        let state = guard.get_or_insert_with(I18nState::embedded);
        if let Some(map) = state.translations.get(&state.current_lang)
            && let Some(val) = map.get(key)
        {
            return val.clone();
        }
        if let Some(map) = state.translations.get(DEFAULT_LANGUAGE)
            && let Some(val) = map.get(key)
        {
            return val.clone();
        }
    }
    key.to_string()
}

/// Detect the system language from the usual locale variables.
pub fn detect_system_language() -> String {
    for var in &["LC_ALL", "LC_MESSAGES", "LANG", "LANGUAGE"] {
        if let Ok(val) = std::env::var(var)
            && let Some(lang) = match_system_locale(&val)
        {
            return lang;
        }
    }
    DEFAULT_LANGUAGE.to_string()
}

/// Match a locale string ("ko_KR.UTF-8", "en-US") to a supported language.
fn match_system_locale(locale: &str) -> Option<String> {
    let normalized = locale.to_lowercase().replace('_', "-");
    let lang_part = normalized.split(['.', '@']).next().unwrap_or(&normalized);
    let primary = lang_part.split('-').next().unwrap_or(lang_part);

    LANGUAGES
        .iter()
        .find(|(code, _)| *code == primary)
        .map(|(code, _)| code.to_string())
}

/// Parse a simple key=value translation file.
/// Format: one `key=value` per line. Lines starting with `#` are comments.
/// `\n` in a value becomes a newline.
fn parse_translations(data: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            map.insert(key.trim().to_string(), val.trim().replace("\\n", "\n"));
        }
    }
    map
}

/// Translation macro. Usage: `t!("menu.drawing")` or `t!("gallery.count", count = 3)`
#[macro_export]
macro_rules! t {
    ($key:expr) => {
        $crate::i18n::translate($key)
    };
    ($key:expr, $($name:ident = $val:expr),+ $(,)?) => {{
        let mut s = $crate::i18n::translate($key);
        $(
            s = s.replace(concat!("{", stringify!($name), "}"), &format!("{}", $val));
        )+
        s
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locales_define_the_same_keys() {
        let ko = parse_translations(include_str!("../locales/ko.txt"));
        let en = parse_translations(include_str!("../locales/en.txt"));
        let mut missing: Vec<&String> = ko.keys().filter(|k| !en.contains_key(*k)).collect();
        missing.extend(en.keys().filter(|k| !ko.contains_key(*k)));
        assert!(missing.is_empty(), "keys missing from a locale: {missing:?}");
    }

    #[test]
    fn system_locales_map_to_supported_languages() {
        assert_eq!(match_system_locale("ko_KR.UTF-8").as_deref(), Some("ko"));
        assert_eq!(match_system_locale("en-US").as_deref(), Some("en"));
        assert_eq!(match_system_locale("de_DE@euro"), None);
    }

    #[test]
    fn unknown_keys_return_the_key() {
        assert_eq!(translate("no.such.key"), "no.such.key");
    }
}
