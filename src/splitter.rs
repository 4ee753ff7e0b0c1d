// --- 双语歌词行拆分核心 ---
//
// 输入形如 `[00:02.24]De la fuma mala fuma 吞云吐雾间` 的 LRC 行，
// 以第一个汉字为界，拆成两行带相同时间戳的歌词。

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// 汉字判定区间 (CJK 统一表意文字基本区)
const CJK_RANGE: std::ops::RangeInclusive<char> = '\u{4E00}'..='\u{9FA5}';

/// 匹配行首的时间戳标签 `[...]`（非贪婪，到第一个 `]` 为止）以及其后的全部内容。
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Captures: (Group 'tag': 时间戳含方括号) (Group 'content': 剩余文本)
    Regex::new(r"^(?P<tag>\[.*?\])(?P<content>.*)").expect("未能编译 TIMESTAMP_REGEX")
});

/// 单行歌词的解析结果，只借用输入，不做存储。
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LyricLine<'a> {
    pub raw: &'a str,
    pub timestamp: Option<&'a str>,
    pub content: Option<&'a str>,
}

/// 单行处理结果：原样保留，或拆分为 原文 / 翻译 两行。
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SplitResult<'a> {
    Unchanged(&'a str),
    Split { original: String, translation: String },
}

/// 一次处理的统计信息。
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct SplitReport {
    pub total_lines: usize,
    pub split_lines: usize,
}

impl SplitReport {
    /// 输出行数 = 输入行数 + 被拆分的行数
    pub fn output_lines(&self) -> usize {
        self.total_lines + self.split_lines
    }
}

/// 判断字符是否位于汉字区间内。
pub fn is_chinese_char(c: char) -> bool {
    CJK_RANGE.contains(&c)
}

/// 解析一行：提取行首时间戳与其后的内容。没有时间戳时两者都为 `None`。
pub fn parse_line(line: &str) -> LyricLine<'_> {
    match TIMESTAMP_REGEX.captures(line) {
        Some(caps) => LyricLine {
            raw: line,
            timestamp: caps.name("tag").map(|m| m.as_str()),
            content: caps.name("content").map(|m| m.as_str()),
        },
        None => LyricLine { raw: line, timestamp: None, content: None },
    }
}

/// 返回内容中第一个汉字的字节偏移。
pub fn find_split_index(content: &str) -> Option<usize> {
    content
        .char_indices()
        .find(|&(_, c)| is_chinese_char(c))
        .map(|(index, _)| index)
}

/// 按单行规则处理。
///
/// 1. 去除首尾空白；
/// 2. 无时间戳或时间戳后无内容 -> 原样返回；
/// 3. 第一个汉字位于内容开头或不存在 -> 原样返回；
/// 4. 否则在该位置拆分，两半各自去除空白后分别拼上时间戳。
pub fn split_line(line: &str) -> SplitResult<'_> {
    let trimmed = line.trim(); // 匹配与原样返回都使用去除空白后的行
    let parsed = parse_line(trimmed);

    // 行首没有时间戳（例如 "Lyrics by ..." 之类的元数据行），原样返回
    let (Some(timestamp), Some(content)) = (parsed.timestamp, parsed.content) else {
        return SplitResult::Unchanged(parsed.raw);
    };
    // 只有时间戳没有歌词（常见于开头的空拍标记），原样返回
    if content.trim().is_empty() {
        return SplitResult::Unchanged(parsed.raw);
    }

    match find_split_index(content) {
        // 汉字之前有原文：从第一个汉字处一分为二
        Some(split_index) if split_index > 0 => {
            let (original_text, translation_text) = content.split_at(split_index);
            SplitResult::Split {
                original: format!("{}{}", timestamp, original_text.trim()),
                translation: format!("{}{}", timestamp, translation_text.trim()),
            }
        }
        // 没有汉字，或整行从汉字开始（无原文可拆），原样返回
        _ => SplitResult::Unchanged(parsed.raw),
    }
}

/// 将处理结果还原为文本（拆分结果含一个换行符）。
pub fn render<'a>(result: &SplitResult<'a>) -> Cow<'a, str> {
    match result {
        SplitResult::Unchanged(line) => Cow::Borrowed(*line),
        SplitResult::Split { original, translation } => {
            Cow::Owned(format!("{}\n{}", original, translation))
        }
    }
}

/// 处理整段文本：按 `\n` 切分，逐行处理后再以 `\n` 连接，顺序不变。
pub fn process(input: &str) -> String {
    process_with_report(input).0
}

/// 同 [`process`]，并附带行数统计。
pub fn process_with_report(input: &str) -> (String, SplitReport) {
    let mut report = SplitReport::default();
    // 拆分会重复时间戳，预留一些额外容量
    let mut output = String::with_capacity(input.len() + input.len() / 2);

    // 各行互不影响，按原顺序逐行处理
    for (index, line) in input.split('\n').enumerate() {
        if index > 0 {
            output.push('\n'); // 行间分隔符
        }
        let result = split_line(line);
        report.total_lines += 1;
        if matches!(result, SplitResult::Split { .. }) {
            report.split_lines += 1;
        }
        output.push_str(&render(&result));
    }

    (output, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[00:00.00]Montagem Nada Tropica - Eternxlkz
[00:01.28]Composed by：Eternxlkz
[00:02.24]De la fuma mala fuma 吞云吐雾间 尽是劣质烟雾
[00:03.45]Se la pasan diciendo que soy mala 他们总是喋喋不休 说我品性不佳";

    #[test]
    fn keeps_line_without_chinese() {
        assert_eq!(
            process("[00:01.28]Composed by：Eternxlkz"),
            "[00:01.28]Composed by：Eternxlkz"
        );
    }

    #[test]
    fn splits_mixed_line_at_first_chinese_char() {
        assert_eq!(
            process("[00:02.24]De la fuma mala fuma 吞云吐雾间 尽是劣质烟雾"),
            "[00:02.24]De la fuma mala fuma\n[00:02.24]吞云吐雾间 尽是劣质烟雾"
        );
    }

    #[test]
    fn keeps_timestamp_without_content() {
        assert_eq!(process("[00:00.00]"), "[00:00.00]");
        assert_eq!(process("[00:00.00]   "), "[00:00.00]");
    }

    #[test]
    fn keeps_line_without_timestamp() {
        assert_eq!(process("Lyrics by Someone"), "Lyrics by Someone");
        assert_eq!(process("作词 某人 Someone"), "作词 某人 Someone");
    }

    #[test]
    fn keeps_chinese_only_content() {
        assert_eq!(process("[00:10.00]你好世界"), "[00:10.00]你好世界");
    }

    #[test]
    fn leading_whitespace_before_chinese_still_splits() {
        // 内容中汉字前的空格使拆分位置 > 0，原文部分去空白后为空
        assert_eq!(process("[00:10.00] 你好"), "[00:10.00]\n[00:10.00]你好");
    }

    #[test]
    fn trailing_original_text_goes_with_translation() {
        assert_eq!(
            process("[01:00.00]Hello 你好 (remix)"),
            "[01:00.00]Hello\n[01:00.00]你好 (remix)"
        );
    }

    #[test]
    fn timestamp_match_is_non_greedy() {
        assert_eq!(
            split_line("[ti:x]abc[de]中文"),
            SplitResult::Split {
                original: "[ti:x]abc[de]".to_string(),
                translation: "[ti:x]中文".to_string(),
            }
        );
    }

    #[test]
    fn chars_outside_range_do_not_split() {
        // 日文假名、U+9FA6 之后的字符、全角标点都不算汉字
        assert!(!is_chinese_char('あ'));
        assert!(!is_chinese_char('\u{9FA6}'));
        assert!(!is_chinese_char('：'));
        assert!(is_chinese_char('\u{4E00}'));
        assert!(is_chinese_char('\u{9FA5}'));
        assert_eq!(process("[00:01.00]こんにちは"), "[00:01.00]こんにちは");
    }

    #[test]
    fn parse_line_extracts_timestamp_and_content() {
        let parsed = parse_line("[00:03.45]Se la pasan");
        assert_eq!(parsed.timestamp, Some("[00:03.45]"));
        assert_eq!(parsed.content, Some("Se la pasan"));
        assert_eq!(parsed.raw, "[00:03.45]Se la pasan");

        let plain = parse_line("no tag [00:01]");
        assert_eq!(plain.timestamp, None);
        assert_eq!(plain.content, None);
    }

    #[test]
    fn find_split_index_returns_byte_offset() {
        assert_eq!(find_split_index("ab中"), Some(2));
        assert_eq!(find_split_index("é中"), Some(2));
        assert_eq!(find_split_index("abc"), None);
        assert_eq!(find_split_index(""), None);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let (output, report) = process_with_report("");
        assert_eq!(output, "");
        assert_eq!(report, SplitReport { total_lines: 1, split_lines: 0 });
    }

    #[test]
    fn multi_line_input_matches_per_line_results() {
        let input = "[00:01.28]Composed by：Eternxlkz\n\
                     [00:02.24]De la fuma mala fuma 吞云吐雾间 尽是劣质烟雾\n\
                     [00:00.00]\n\
                     Lyrics by Someone\n\
                     [00:10.00]你好世界";
        let expected = "[00:01.28]Composed by：Eternxlkz\n\
                        [00:02.24]De la fuma mala fuma\n\
                        [00:02.24]吞云吐雾间 尽是劣质烟雾\n\
                        [00:00.00]\n\
                        Lyrics by Someone\n\
                        [00:10.00]你好世界";
        assert_eq!(process(input), expected);
    }

    #[test]
    fn line_count_law_holds() {
        let (output, report) = process_with_report(SAMPLE);
        assert_eq!(report.total_lines, 4);
        assert_eq!(report.split_lines, 2);
        assert_eq!(output.split('\n').count(), report.output_lines());
    }

    #[test]
    fn split_halves_keep_timestamp_and_content() {
        for line in SAMPLE.lines() {
            let trimmed = line.trim();
            if let SplitResult::Split { original, translation } = split_line(line) {
                let timestamp = parse_line(trimmed).timestamp.unwrap();
                assert!(original.starts_with(timestamp));
                assert!(translation.starts_with(timestamp));

                // 去掉时间戳后拼接两半，与去除空白的原内容一致（拆分处空白除外）
                let rebuilt = format!(
                    "{}{}",
                    &original[timestamp.len()..],
                    &translation[timestamp.len()..]
                );
                let content: String = trimmed[timestamp.len()..].split_whitespace().collect();
                let rebuilt: String = rebuilt.split_whitespace().collect();
                assert_eq!(rebuilt, content);
            }
        }
    }

    #[test]
    fn output_preserves_input_order() {
        let output = process(SAMPLE);
        let timestamps: Vec<&str> = output
            .lines()
            .filter_map(|line| parse_line(line).timestamp)
            .collect();
        assert_eq!(
            timestamps,
            vec!["[00:00.00]", "[00:01.28]", "[00:02.24]", "[00:02.24]", "[00:03.45]", "[00:03.45]"]
        );
    }

    #[test]
    fn surrounding_whitespace_and_carriage_returns_are_trimmed() {
        assert_eq!(process("  [00:05.00]abc  \r"), "[00:05.00]abc");
        assert_eq!(process("a\n\nb"), "a\n\nb");
    }
}
