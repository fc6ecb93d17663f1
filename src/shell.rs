use rand::Rng;

use crate::models::Settings;

/// Motivational strings; one is picked uniformly at random per invocation.
pub const QUOTES: &[&str] = &[
    "Small steps every day lead to big results.",
    "Done is better than perfect.",
    "You don't have to be great to start, but you have to start to be great.",
    "Focus on the next task, not the whole mountain.",
];

pub const CONTACT_EMAIL: &str = "hello@donext.app";

pub const THEME_LIGHT: &str = "light";
pub const THEME_DARK: &str = "dark";

pub fn random_quote() -> &'static str {
    let mut rng = rand::rng();
    QUOTES[rng.random_range(0..QUOTES.len())]
}

pub fn is_dark(settings: &Settings) -> bool {
    settings.theme == THEME_DARK
}

/// Persists a theme choice; only the two known names are accepted.
pub fn set_theme(settings: &mut Settings, theme: &str) -> Result<(), String> {
    match theme.trim().to_lowercase().as_str() {
        THEME_LIGHT => settings.theme = THEME_LIGHT.to_string(),
        THEME_DARK => settings.theme = THEME_DARK.to_string(),
        other => return Err(format!("unknown theme: {other} (expected light or dark)")),
    }
    Ok(())
}

/// Flips between light and dark, returning the new theme name.
pub fn toggle_theme(settings: &mut Settings) -> &'static str {
    let next = if is_dark(settings) {
        THEME_LIGHT
    } else {
        THEME_DARK
    };
    settings.theme = next.to_string();
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_quote_comes_from_the_fixed_set() {
        for _ in 0..32 {
            assert!(QUOTES.contains(&random_quote()));
        }
    }

    #[test]
    fn set_theme_accepts_only_known_names() {
        let mut settings = Settings::default();
        set_theme(&mut settings, " Dark ").expect("dark is valid");
        assert!(is_dark(&settings));
        set_theme(&mut settings, "light").expect("light is valid");
        assert!(!is_dark(&settings));
        assert!(set_theme(&mut settings, "solarized").is_err());
        assert_eq!(settings.theme, THEME_LIGHT);
    }

    #[test]
    fn toggle_theme_flips_and_persists_in_settings() {
        let mut settings = Settings::default();
        assert_eq!(toggle_theme(&mut settings), THEME_DARK);
        assert_eq!(toggle_theme(&mut settings), THEME_LIGHT);
        assert_eq!(settings.theme, THEME_LIGHT);
    }
}
