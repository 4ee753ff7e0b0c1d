// --- 依赖引入 ---
use clap::{CommandFactory, Parser}; // 命令行参数解析
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod splitter;

use splitter::{SplitReport, SplitResult};

// --- 常量定义 ---

// 文件扩展名与自动输出文件名后缀
const LRC_EXTENSION: &str = ".lrc";
const AUTO_OUTPUT_SUFFIX: &str = "_split";
/// 表示标准输入/输出的路径参数
const STDIO_PATH: &str = "-";

// 用户交互信息常量
const INPUT_FILE_PATH_PROMPT: &str = "请输入 {} 歌词文件路径: ";
const OUTPUT_FILE_PATH_PROMPT: &str = "请输入输出文件路径 (直接回车则自动生成): ";
const EMPTY_FILE_PATH_ERROR: &str = "输入的 {} 文件路径不能为空";
const FILE_NOT_FOUND_ERROR: &str = "错误: 输入文件不存在";

// 错误信息模板
const CONVERSION_ERROR_MSG: &str = "拆分过程中发生错误:";

/// UTF-8 BOM，读取输入时丢弃
const UTF8_BOM: char = '\u{FEFF}';

// 进度条显示相关常量
const PROGRESS_BAR_LENGTH: usize = 20; // 进度条的字符显示长度
const PROGRESS_BAR_THRESHOLD: usize = 64 * 1024 * 1024; // 64MB, 文件小于此大小时不显示进度条

// 终端输出颜色 ANSI 转义码
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// “加载示例”所用的示例歌词
const EXAMPLE_LYRICS: &str = "[00:00.00]Montagem Nada Tropica - Eternxlkz
[00:01.28]Composed by：Eternxlkz
[00:02.24]De la fuma mala fuma 吞云吐雾间 尽是劣质烟雾
[00:03.45]Se la pasan diciendo que soy mala 他们总是喋喋不休 说我品性不佳
[00:05.38]Porque no me aguanto drama de nada 只因我向来无法容忍 任何无谓的闹剧
[00:07.37]Dime si vienes a mi cama a mi cama 告诉我 你是否会来我的床榻 我的床榻";

// --- 日志宏定义 ---
// 结果写到 stdout 时，提示与成功信息改走 stderr，避免混入输出

macro_rules! log_info {
    ($($arg:tt)*) => {
        if quiet_stdout() {
            eprintln!("{}[提示]{} {}", CYAN, RESET, format!($($arg)*))
        } else {
            println!("\n{}[提示]{} {}", CYAN, RESET, format!($($arg)*))
        }
    }
}
macro_rules! log_success {
    ($($arg:tt)*) => {
        if quiet_stdout() {
            eprintln!("{}[成功]{} {}", GREEN, RESET, format!($($arg)*))
        } else {
            println!("\n{}[成功]{} {}", GREEN, RESET, format!($($arg)*))
        }
    }
}
macro_rules! log_warn {
    ($($arg:tt)*) => {
        eprintln!("\n{}[警告]{} {}", YELLOW, RESET, format!($($arg)*))
    }
}
macro_rules! log_error {
    ($($arg:tt)*) => {
        eprintln!("\n{}[错误]{} {}", RED, RESET, format!($($arg)*))
    }
}

static STDOUT_RESERVED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// 结果是否正写往标准输出
fn quiet_stdout() -> bool {
    STDOUT_RESERVED.load(std::sync::atomic::Ordering::Relaxed)
}

fn reserve_stdout() {
    STDOUT_RESERVED.store(true, std::sync::atomic::Ordering::Relaxed);
}

// --- 自定义错误类型 ---

/// 命令行外壳中可能发生的错误。拆分核心本身不会失败。
#[derive(Debug)]
enum ConversionError {
    Io(io::Error),         // 读写错误（包括非 UTF-8 内容）
    InvalidInput(String),  // 路径或参数不合法
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::Io(e) => write!(f, "文件读写错误: {}", e),
            ConversionError::InvalidInput(msg) => write!(f, "输入无效: {}", msg),
        }
    }
}

impl Error for ConversionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConversionError::Io(e) => Some(e),
            ConversionError::InvalidInput(_) => None,
        }
    }
}

impl From<io::Error> for ConversionError {
    fn from(err: io::Error) -> Self {
        ConversionError::Io(err)
    }
}

// --- Clap 命令行接口定义 ---

/// 定义程序的命令行参数和选项。
#[derive(Parser, Debug)]
#[command(
    version,
    about = "LRC 双语歌词拆分工具",
    long_about = "将“原文+中文翻译”连写在同一行的 LRC 歌词，以第一个汉字为界拆成两行相同时间戳的歌词。"
)]
struct CliArgs {
    /// 运行交互模式，此选项会忽略其他所有位置参数。
    #[arg(short, long)]
    interactive: bool,

    /// 输入文件路径，`-` 表示标准输入。
    /// 只提供此参数时进入自动模式，输出到同目录下的 `<文件名>_split.lrc`。
    #[arg(index = 1)]
    input_file: Option<PathBuf>,

    /// 输出文件路径。提供时进入手动模式。
    #[arg(index = 2)]
    output_file: Option<PathBuf>,

    /// 将结果写到标准输出，而不是文件。
    #[arg(long, conflicts_with = "output_file")]
    stdout: bool,

    /// 处理内置的示例歌词并打印结果。
    #[arg(long, conflicts_with_all = ["input_file", "interactive"])]
    example: bool,

    /// 出错后不等待按 Enter 键退出。
    #[arg(long)]
    no_wait: bool,
}

/// 一次拆分任务的输出目标
#[derive(Debug, PartialEq, Eq)]
enum OutputTarget {
    Stdout,
    File(PathBuf),
}

// --- 程序主入口 ---

fn main() -> ExitCode {
    // 无任何参数（例如双击运行）时直接进入交互模式
    if std::env::args().len() <= 1 {
        interactive_mode();
        return ExitCode::SUCCESS;
    }

    let args = CliArgs::parse();

    if args.interactive {
        interactive_mode();
        return ExitCode::SUCCESS;
    }

    if args.example {
        reserve_stdout();
        return match run_example() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log_error!("{} {}", CONVERSION_ERROR_MSG, e);
                ExitCode::FAILURE
            }
        };
    }

    let Some(input_path) = args.input_file else {
        log_error!("错误：需要指定输入文件或使用 --interactive 选项。");
        CliArgs::command().print_help().unwrap_or_else(|e| log_error!("无法打印帮助信息: {}", e));
        return ExitCode::FAILURE;
    };

    let target = resolve_output_target(&input_path, args.output_file, args.stdout);
    if target == OutputTarget::Stdout {
        reserve_stdout();
    }

    if execute_split(&input_path, &target) {
        // 结果写往 stdout 时通常处于管道中，不等待
        if !args.no_wait && target != OutputTarget::Stdout {
            wait_for_exit();
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

// --- 模式处理函数 (由 main 调用) ---

/// 根据参数决定输出目标：
/// `--stdout` 或输入为 `-` 且未给出输出路径 -> 标准输出；
/// 给出输出路径 -> 手动模式；否则 -> 自动生成输出路径。
fn resolve_output_target(input_path: &Path, output_file: Option<PathBuf>, to_stdout: bool) -> OutputTarget {
    match output_file {
        _ if to_stdout => OutputTarget::Stdout,
        Some(path) if path.as_os_str() == STDIO_PATH => OutputTarget::Stdout,
        Some(path) => OutputTarget::File(path),
        None if is_stdio(input_path) => OutputTarget::Stdout,
        None => OutputTarget::File(auto_output_path(input_path)),
    }
}

/// 处理内置示例并打印结果。
fn run_example() -> Result<(), ConversionError> {
    let mut stdout = io::stdout().lock();
    let output_lines = write_example(&mut stdout)?;
    log_success!(
        "示例处理完成：{} 行输入，{} 行输出。",
        EXAMPLE_LYRICS.lines().count(),
        output_lines
    );
    Ok(())
}

/// 将示例歌词的拆分结果写入 `writer`，返回输出行数。
fn write_example<W: Write>(writer: &mut W) -> Result<usize, ConversionError> {
    let output = splitter::process(EXAMPLE_LYRICS);
    writeln!(writer, "{}", output)?;
    writer.flush()?;
    Ok(output.lines().count())
}

/// 运行交互式命令行界面，循环引导用户拆分文件。
fn interactive_mode() {
    log_info!("直接将文件拖到程序图标上可自动拆分");
    loop {
        let input_path = match read_file_path(INPUT_FILE_PATH_PROMPT, LRC_EXTENSION) {
            Ok(path) => path,
            Err(e) => {
                // 标准输入关闭或不可读时无法继续交互
                log_error!("读取输入路径时出错: {}", e);
                return;
            }
        };
        if !input_path.exists() {
            log_error!("{}", FILE_NOT_FOUND_ERROR);
            continue;
        }

        let output_path = match read_user_input(OUTPUT_FILE_PATH_PROMPT) {
            Ok(path_str) => {
                let cleaned = clean_path_input(&path_str);
                if cleaned.is_empty() {
                    auto_output_path(&input_path)
                } else {
                    PathBuf::from(cleaned)
                }
            }
            Err(e) => {
                log_error!("读取输出路径时出错: {}", e);
                return;
            }
        };

        execute_split(&input_path, &OutputTarget::File(output_path));
        log_info!("本次拆分完成。您可以继续拆分下一个文件，或关闭此窗口。");
    }
}

// --- 核心拆分流程 ---

/// 逐行读取输入、拆分并写出，返回统计信息。
///
/// 大文件按行流式处理，不会整体读入内存。输出与 [`splitter::process`] 一致：
/// 行间以 `\n` 分隔，末尾是否有换行与输入相同；输入全为空白时不写出任何内容。
fn split_stream<R: BufRead, W: Write>(
    mut reader: R,
    writer: &mut W,
    total_bytes: usize,
) -> Result<SplitReport, ConversionError> {
    let mut report = SplitReport::default();
    let mut processed_bytes: usize = 0; // 跟踪已处理字节数
    let mut buffer = String::new(); // 复用的行缓冲
    // 出现第一行非空内容之前，空行的换行符暂存于此；全为空白时整体丢弃
    let mut pending_blank = String::new();
    let mut seen_content = false;

    loop {
        buffer.clear();
        // read_line 保留行尾的 '\n'，遇到非 UTF-8 内容时返回 InvalidData 错误
        let bytes_read = reader.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // 读到文件末尾
        }
        processed_bytes += bytes_read;

        // 拆出行尾换行符，写回时原样附上
        let (line, newline) = match buffer.strip_suffix('\n') {
            Some(line) => (line, "\n"),
            None => (buffer.as_str(), ""),
        };
        // 只有第一行可能带 BOM
        let line = if report.total_lines == 0 {
            line.strip_prefix(UTF8_BOM).unwrap_or(line)
        } else {
            line
        };

        // 交给核心逻辑处理这一行，并记录统计
        let result = splitter::split_line(line);
        report.total_lines += 1;
        if matches!(result, SplitResult::Split { .. }) {
            report.split_lines += 1;
        }
        let rendered = splitter::render(&result);

        if !seen_content && rendered.is_empty() {
            pending_blank.push_str(newline); // 暂不写出，等确认输入并非全空
        } else {
            if !seen_content {
                // 第一行有内容的行：先补写之前暂存的空行
                writer.write_all(pending_blank.as_bytes())?;
                seen_content = true;
            }
            write!(writer, "{}{}", rendered, newline)?;
        }

        display_progress_bar(processed_bytes, total_bytes);
    }

    writer.flush()?; // 确保缓冲区内容全部写出
    if total_bytes >= PROGRESS_BAR_THRESHOLD {
        println!(); // 结束进度条所在行
    }

    // 空白输入得到空输出，统计也清零
    if !seen_content {
        return Ok(SplitReport::default());
    }
    Ok(report)
}

/// 将 `input_path`（`-` 表示标准输入）拆分后写往 `target`。
fn split_file(input_path: &Path, target: &OutputTarget) -> Result<SplitReport, ConversionError> {
    // 标准输入与文件走同一条流式处理路径
    if is_stdio(input_path) {
        return split_to_target(io::stdin().lock(), input_path, target, 0);
    }
    if !input_path.exists() {
        return Err(ConversionError::InvalidInput(FILE_NOT_FOUND_ERROR.to_string()));
    }

    let file = File::open(input_path)?;
    let total_bytes = file.metadata()?.len() as usize; // 用于进度条
    split_to_target(BufReader::new(file), input_path, target, total_bytes)
}

/// 为 `target` 创建写入器并执行拆分。写文件失败时删除已写出一半的输出文件。
fn split_to_target<R: BufRead>(
    reader: R,
    input_path: &Path,
    target: &OutputTarget,
    total_bytes: usize,
) -> Result<SplitReport, ConversionError> {
    match target {
        OutputTarget::Stdout => {
            // 结果写往标准输出时不显示进度条
            let mut writer = BufWriter::new(io::stdout().lock());
            split_stream(reader, &mut writer, 0)
        }
        OutputTarget::File(output_path) => {
            // 防止覆盖输入文件
            if same_file(input_path, output_path) {
                return Err(ConversionError::InvalidInput(format!(
                    "输出文件不能与输入文件相同: {}",
                    output_path.display()
                )));
            }
            let mut writer = BufWriter::new(File::create(output_path)?);
            let result = split_stream(reader, &mut writer, total_bytes);
            if result.is_err() {
                drop(writer); // 先关闭文件句柄再删除
                if let Err(e) = std::fs::remove_file(output_path) {
                    log_warn!("无法删除不完整的输出文件 {:?}: {}", output_path, e);
                }
            }
            result
        }
    }
}

/// 封装拆分过程，包括日志打印和错误处理。
/// 返回 `true` 表示发生了错误。
fn execute_split(input_path: &Path, target: &OutputTarget) -> bool {
    match split_file(input_path, target) {
        Ok(report) => {
            // 根据统计结果给出相应提示
            if report.total_lines == 0 {
                log_warn!("输入为空或只含空白，未写出任何内容。");
            } else if report.split_lines == 0 {
                log_warn!("未发现可拆分的双语歌词行，输出与输入一致。");
            }
            // 输出目标的显示名称
            let destination = match target {
                OutputTarget::Stdout => "标准输出".to_string(),
                OutputTarget::File(path) => format!("{:?}", path),
            };
            log_success!(
                "拆分完成：{} 行中拆分了 {} 行，共输出 {} 行 -> {}",
                report.total_lines,
                report.split_lines,
                report.output_lines(),
                destination
            );
            false
        }
        Err(e) => {
            // 拆分失败，打印错误日志
            log_error!("{} {}", CONVERSION_ERROR_MSG, e);
            true // 返回 true 表示发生了错误，可能需要等待
        }
    }
}

// --- 辅助函数 ---

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO_PATH
}

/// 判断两个路径是否指向同一文件（输出文件尚不存在时视为不同）。
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// 在程序退出前暂停，等待用户按 Enter 键。
fn wait_for_exit() {
    log_info!("按下 Enter 键退出...");
    let mut dummy = String::new();
    let _ = io::stdin().read_line(&mut dummy);
}

/// 根据输入路径自动生成输出路径：同目录，文件名加 "_split" 后缀，扩展名为 .lrc。
fn auto_output_path(input_path: &Path) -> PathBuf {
    // 获取输入文件名（不含扩展名），失败时使用 "output"
    let file_stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    // 原文件名 + "_split" + ".lrc"，与输入文件放在同一目录
    let new_file_name = format!("{}{}{}", file_stem, AUTO_OUTPUT_SUFFIX, LRC_EXTENSION);
    input_path.with_file_name(new_file_name)
}

/// 读取用户在命令行中的单行输入（已去除首尾空白）。
fn read_user_input(prompt: &str) -> Result<String, ConversionError> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err(ConversionError::InvalidInput("标准输入已关闭".to_string()));
    }
    Ok(input.trim().to_string())
}

/// 去除路径首尾成对的引号（常见于拖放文件操作）。
fn clean_path_input(path_str: &str) -> &str {
    let trimmed = path_str.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

/// 读取用户输入的文件路径，直到得到非空路径。
fn read_file_path(prompt_template: &str, extension: &str) -> Result<PathBuf, ConversionError> {
    loop {
        let path_str = read_user_input(&prompt_template.replace("{}", extension))?;
        let cleaned_path_str = clean_path_input(&path_str);

        if cleaned_path_str.is_empty() {
            log_error!("{}", EMPTY_FILE_PATH_ERROR.replace("{}", extension));
            continue;
        }

        return Ok(PathBuf::from(cleaned_path_str));
    }
}

/// 在命令行中显示一个简单的文本进度条。
/// 仅当文件总大小超过阈值时显示。
fn display_progress_bar(current: usize, total: usize) {
    if total == 0 || total < PROGRESS_BAR_THRESHOLD { return; }

    let percentage = (current as f64 / total as f64 * 100.0).min(100.0);
    let filled_length = (PROGRESS_BAR_LENGTH as f64 * percentage / 100.0) as usize;
    let bar = format!(
        "{}{}",
        "=".repeat(filled_length),
        " ".repeat(PROGRESS_BAR_LENGTH.saturating_sub(filled_length))
    );
    // \r 回到行首，原地刷新
    print!("\r拆分进度: [{}] {:>3.0}% ({}/{})", bar, percentage, current, total);
    let _ = io::stdout().flush();
}
