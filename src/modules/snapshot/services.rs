use super::models::ServiceEntry;
use serde::Deserialize;

#[derive(Deserialize)]
struct RawService {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "DisplayName", default)]
    display_name: String,
    #[serde(rename = "StartType", default)]
    start_type: String,
}

/// 解析 PowerShell ConvertTo-Json 输出；单个服务时输出不是数组
pub fn parse_services_json(json: &str) -> Result<Vec<ServiceEntry>, serde_json::Error> {
    let json = json.trim();
    if json.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawService> = if json.starts_with('[') {
        serde_json::from_str(json)?
    } else {
        vec![serde_json::from_str(json)?]
    };

    Ok(raw
        .into_iter()
        .map(|r| ServiceEntry {
            name: r.name,
            display_name: r.display_name,
            start_type: r.start_type,
        })
        .collect())
}

/// 枚举当前系统服务
#[cfg(windows)]
pub fn collect() -> (Vec<ServiceEntry>, Vec<String>) {
    let script = "Get-Service | Select-Object Name,DisplayName,@{n='StartType';e={$_.StartType.ToString()}} | ConvertTo-Json";
    let output = std::process::Command::new("powershell")
        .args(["-NoProfile", "-Command", script])
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            match parse_services_json(&text) {
                Ok(services) => (services, Vec::new()),
                Err(e) => (Vec::new(), vec![format!("服务列表解析失败: {}", e)]),
            }
        }
        Ok(out) => (
            Vec::new(),
            vec![format!(
                "服务枚举失败: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )],
        ),
        Err(e) => (Vec::new(), vec![format!("无法执行 PowerShell: {}", e)]),
    }
}

#[cfg(not(windows))]
pub fn collect() -> (Vec<ServiceEntry>, Vec<String>) {
    (Vec::new(), Vec::new())
}
