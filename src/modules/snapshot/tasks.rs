use super::models::TaskEntry;

/// 解析 `schtasks /query /fo csv /nh` 输出
///
/// 每行形如 `"\Demo\Updater","2026/01/01 10:00:00","就绪"`，
/// 第一列为任务完整路径
pub fn parse_tasks_csv(csv: &str) -> Vec<TaskEntry> {
    let mut tasks = Vec::new();

    for line in csv.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields = split_csv_line(line);
        let Some(path) = fields.first() else { continue };
        if !path.starts_with('\\') {
            continue;
        }

        let name = path.rsplit('\\').next().unwrap_or(path).to_string();
        tasks.push(TaskEntry {
            name,
            path: path.clone(),
        });
    }

    tasks
}

/// 最小 CSV 拆分，仅处理 schtasks 的带引号字段
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// 枚举当前系统的计划任务
#[cfg(windows)]
pub fn collect() -> (Vec<TaskEntry>, Vec<String>) {
    let output = std::process::Command::new("schtasks")
        .args(["/query", "/fo", "csv", "/nh"])
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            (parse_tasks_csv(&text), Vec::new())
        }
        Ok(out) => (
            Vec::new(),
            vec![format!(
                "计划任务枚举失败: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )],
        ),
        Err(e) => (Vec::new(), vec![format!("无法执行 schtasks: {}", e)]),
    }
}

#[cfg(not(windows))]
pub fn collect() -> (Vec<TaskEntry>, Vec<String>) {
    (Vec::new(), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_task_rows() {
        let csv = "\"\\Demo\\Updater\",\"2026/01/01 10:00:00\",\"就绪\"\n\"\\Other\",\"N/A\",\"禁用\"\n";
        let tasks = parse_tasks_csv(csv);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].path, "\\Demo\\Updater");
        assert_eq!(tasks[0].name, "Updater");
        assert_eq!(tasks[1].name, "Other");
    }

    #[test]
    fn skips_non_task_lines() {
        let csv = "信息: 当前没有任务\n\"TaskName\",\"Next Run Time\",\"Status\"\n";
        assert!(parse_tasks_csv(csv).is_empty());
    }

    #[test]
    fn handles_commas_inside_quotes() {
        let csv = "\"\\Vendor, Inc\\Sync\",\"N/A\",\"就绪\"\n";
        let tasks = parse_tasks_csv(csv);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].path, "\\Vendor, Inc\\Sync");
        assert_eq!(tasks[0].name, "Sync");
    }
}
