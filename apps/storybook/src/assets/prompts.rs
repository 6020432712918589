/// Appended to every image prompt, character sheets included.
pub const IMAGE_STYLE_GUIDE: &str = r#"Illustration style: Modern flat illustration with clean lines and a soft, muted color palette. The characters have a friendly, approachable appearance with rounded features and simple, expressive faces. Details are minimal but effective, focusing on essential elements like clothing textures, subtle shadows for depth, and distinct objects. The overall aesthetic is warm, inviting, and slightly whimsical, reminiscent of casual lifestyle or explainer video graphics. The style avoids harsh outlines or heavy shading, opting for a light and airy feel.

IMPORTANT: Do NOT include any text, words, letters, or numbers in the image. The image should be purely visual."#;

pub fn character_sheet_prompt(description: &str) -> String {
    format!(
        "Character sheet showing the following character(s): {description}. \
         Multiple views if possible, white background. {IMAGE_STYLE_GUIDE}"
    )
}

/// The primary description leads so the model anchors on it even when the
/// scene text only names the character.
pub fn page_prompt(primary_description: &str, image_description: &str) -> String {
    format!("{primary_description} {image_description} {IMAGE_STYLE_GUIDE}")
}
