use crate::models::Tone;

pub const COPY_SYSTEM: &str = include_str!("../data/prompts/copy_system.txt");
pub const COPY_USER: &str = include_str!("../data/prompts/copy_user.txt");
pub const IMAGE_PROMPT: &str = include_str!("../data/prompts/image_prompt.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// User turn sent to the chat-completion API.
pub fn copy_prompt(description: &str, tone: Tone) -> String {
    // Tone first: placeholders inside the description stay literal.
    render(
        COPY_USER,
        &[("tone", &tone.prompt_word()), ("description", description)],
    )
}

/// Prompt handed to the diffusion pipeline.
pub fn image_prompt(description: &str) -> String {
    render(IMAGE_PROMPT, &[("description", description)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_multiple_vars() {
        assert_eq!(
            render("{{a}} and {{b}}", &[("a", "cats"), ("b", "dogs")]),
            "cats and dogs"
        );
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!COPY_SYSTEM.is_empty());
        assert!(!COPY_USER.is_empty());
        assert!(!IMAGE_PROMPT.is_empty());
        assert!(COPY_SYSTEM.contains("world-class marketing copywriter"));
    }

    #[test]
    fn test_copy_user_has_placeholders() {
        assert!(COPY_USER.contains("{{tone}}"));
        assert!(COPY_USER.contains("{{description}}"));
    }

    #[test]
    fn test_copy_prompt_embeds_tone_and_description() {
        let description =
            "A plant-based protein bar with 20g protein, no sugar, and compostable wrapper";
        let prompt = copy_prompt(description, Tone::Playful);

        assert!(prompt.starts_with("Write an ad in a **playful** tone"));
        assert!(prompt.contains(description));
        assert!(prompt.contains("Catchy Headline (≤10 words)"));
        assert!(prompt.contains("Ad Body (30-40 words)"));
        assert!(prompt.contains("6 SEO Keywords"));
        assert!(prompt.contains("5 Hashtags"));
        assert!(prompt.ends_with("Format clearly with markdown bullet points."));
    }

    #[test]
    fn test_copy_prompt_leaves_placeholders_in_description() {
        let prompt = copy_prompt("Mugs that say {{tone}}", Tone::Luxury);
        assert!(prompt.contains("Mugs that say {{tone}}"));
        assert!(prompt.contains("**luxury**"));
    }

    #[test]
    fn test_image_prompt_appends_style_suffix() {
        assert_eq!(
            image_prompt("A bamboo toothbrush"),
            "A bamboo toothbrush. minimalist studio product shot, bright lighting, high resolution"
        );
    }
}
