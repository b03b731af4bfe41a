//! 定长重叠分片

/// 把正文切成带重叠的定长分片（按字符计数）
///
/// overlap >= size时退化为无重叠切分，避免死循环。
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || size == 0 {
        return Vec::new();
    }

    if chars.len() <= size {
        return vec![text.to_string()];
    }

    let step = if overlap >= size { size } else { size - overlap };
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}
