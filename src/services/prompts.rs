// Instruction text sent as the final content part of each request.
//
// The instruction must come after the images so the model reads it against
// the page directly above it.

fn orientation(width: u32, height: u32) -> &'static str {
    if height > width {
        "portrait"
    } else if width > height {
        "landscape"
    } else {
        "square"
    }
}

/// Colorization instruction for one page.
///
/// `reference_count` is the number of already-colorized pages embedded
/// before the target; zero on the seed page.
pub fn colorize_instruction(reference_count: usize, width: u32, height: u32) -> String {
    let consistency = if reference_count > 0 {
        format!(
            "Match the character designs, hair colors, outfit colors and overall palette \
             established in the {} reference page(s) above. ",
            reference_count
        )
    } else {
        String::new()
    };

    format!(
        "Fully colorize the manga page directly above. Preserve every line of the original \
         artwork, all screentones and all text exactly as drawn; add natural color only. \
         {}Use consistent lighting across panels. The output image must keep the page's \
         original {}x{} {} aspect ratio and contain the complete page with nothing cropped.",
        consistency,
        width,
        height,
        orientation(width, height),
    )
}

/// Translation instruction for one page.
pub fn translate_instruction(source_language: &str, target_language: &str) -> String {
    format!(
        "Redraw the manga page directly above with every piece of {} text replaced by its \
         {} translation. Keep the artwork, panel layout, bubble shapes and typography style \
         unchanged; only the text content changes. Translate sound effects where they fit \
         naturally, otherwise leave them as drawn.",
        source_language, target_language
    )
}
