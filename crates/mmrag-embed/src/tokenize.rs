use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use crate::EmbedError;

/// Encode `text`, truncate or pad to `max_len`, and return `(input_ids, attention_mask)`
/// shaped `[1, max_len]`.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<(Tensor, Tensor), EmbedError> {
    let enc = tokenizer.encode(text, true).map_err(|e| EmbedError::Tokenizer(e.to_string()))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.truncate(max_len);
    mask.truncate(max_len);
    if ids.len() < max_len {
        let pad = max_len - ids.len();
        // XLM-RoBERTa pad token id is 1.
        ids.extend(std::iter::repeat(1).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, max_len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, max_len))?;
    Ok((input_ids, attention_mask))
}
