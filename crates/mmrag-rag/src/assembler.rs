use mmrag_core::{Prompt, RetrievalResult};

const ROLE: &str = "You are a researcher tasked with providing factual answers from research papers.\n\
You will be given a mix of text, tables, and image(s) usually of charts or graphs.\n\
Use this information to provide answers related to the user question.\n";

/// One instruction block followed by one part per retrieved image.
pub fn assemble(question: &str, result: &RetrievalResult) -> Prompt {
    let context = result.texts.iter().map(|r| r.fragment.payload.as_str()).collect::<Vec<_>>().join("\n");
    let instruction = format!("{ROLE}User-provided question: {question}\n\nText and / or tables:\n{context}");
    result
        .images
        .iter()
        .fold(Prompt::text(instruction), |prompt, r| {
            prompt.with_image(r.fragment.image_media_type(), r.fragment.payload.trim())
        })
}
