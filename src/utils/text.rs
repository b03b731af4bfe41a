//! 文本处理工具，供阅读、摘要与引用阶段复用

/// 按字符数截断文本（不会截断到多字节字符中间）
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// 压缩空白并去掉控制字符
///
/// 制表符与回车等空白类控制字符要先当作分隔符参与压缩，不能直接删除。
pub fn clean_whitespace(text: &str) -> String {
    let filtered: String = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 从URL中提取域名，如 "https://www.example.com/a" -> "example.com"
///
/// 解析失败时返回 "unknown"，与引用展示层的约定一致。
pub fn extract_domain(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    let host = host.strip_prefix("www.").unwrap_or(host);
    // 去掉端口
    let host = host.split(':').next().unwrap_or(host);

    if host.is_empty() {
        "unknown".to_string()
    } else {
        host.to_string()
    }
}

/// 简单分句，返回前N个句子，用于抽取式摘要
pub fn leading_sentences(text: &str, n: usize) -> Vec<String> {
    if text.is_empty() || n == 0 {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let trimmed = current.trim();
            if trimmed.chars().count() > 10 {
                sentences.push(trimmed.to_string());
                if sentences.len() >= n {
                    return sentences;
                }
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if sentences.len() < n && trimmed.chars().count() > 10 {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// 清除LLM输出中的markdown强调符号
pub fn strip_markdown_symbols(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    for marker in ["**", "__", "~~"] {
        while cleaned.contains(marker) {
            cleaned = cleaned.replace(marker, "");
        }
    }
    let cleaned = cleaned.trim_matches('*');
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 去掉行首的列表符号与编号，如 "1. "、"2) "、"- "、"• "
///
/// 编号只有后面紧跟 '.' 或 ')' 时才算列表前缀，
/// 以数字开头的正文（如年份）原样保留。
pub fn strip_list_prefix(line: &str) -> String {
    let stripped = line.trim().trim_start_matches(['-', '•', '*', ' ']);

    let digits = stripped.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        // 编号必为ASCII数字，字符数即字节数
        if let Some(rest) = stripped[digits..].strip_prefix(['.', ')']) {
            return rest.trim().to_string();
        }
    }

    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundary() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // 多字节字符不会被截断到一半
        assert_eq!(truncate_chars("研究摘要", 2), "研究");
    }

    #[test]
    fn test_clean_whitespace() {
        assert_eq!(clean_whitespace("a\t\tb\n\n  c"), "a b c");
        assert_eq!(
            clean_whitespace("  leading and trailing  "),
            "leading and trailing"
        );
        // CRLF行与制表符分隔的单元格不能粘连成一个词
        assert_eq!(clean_whitespace("row1\r\nrow2\tcell"), "row1 row2 cell");
        // 非空白控制字符仍然被剔除
        assert_eq!(clean_whitespace("a\u{0}b"), "ab");
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.example.com/a/b?q=1"),
            "example.com"
        );
        assert_eq!(extract_domain("http://sub.site.org:8080/path"), "sub.site.org");
        assert_eq!(extract_domain(""), "unknown");
    }

    #[test]
    fn test_leading_sentences() {
        let text =
            "Solar capacity doubled in 2024. Wind grew by 12% worldwide. Ok. Battery storage lags behind.";
        let sentences = leading_sentences(text, 2);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "Solar capacity doubled in 2024.");
        // 过短的句子会被跳过
        let three = leading_sentences(text, 3);
        assert_eq!(three[2], "Battery storage lags behind.");
    }

    #[test]
    fn test_strip_markdown_symbols() {
        assert_eq!(strip_markdown_symbols("**bold** and __alt__"), "bold and alt");
        assert_eq!(strip_markdown_symbols("*wrapped*"), "wrapped");
    }

    #[test]
    fn test_strip_list_prefix() {
        assert_eq!(strip_list_prefix("1. First question?"), "First question?");
        assert_eq!(strip_list_prefix("12) Another one?"), "Another one?");
        assert_eq!(strip_list_prefix("- bullet item"), "bullet item");
        assert_eq!(strip_list_prefix("• dotted"), "dotted");
    }

    #[test]
    fn test_strip_list_prefix_keeps_leading_numbers() {
        // 以年份等数字开头的正文不是编号前缀
        assert_eq!(
            strip_list_prefix("2024 trends in solar?"),
            "2024 trends in solar?"
        );
        assert_eq!(
            strip_list_prefix("3. 2024 trends in solar?"),
            "2024 trends in solar?"
        );
    }
}
