//! First-boot script shared by both compute pools.
//!
//! The script is a pure function of the log destination, region and
//! service label. Inside a plan the first two are substitution tokens, so
//! the script must not contain `${` of its own.

use crate::core::resource::{Pool, Value};

/// Marker file the application reads to learn which service it runs.
pub const SERVICE_MARKER: &str = "/tmp/service_type.txt";

pub const USER_DATA_LOG: &str = "/var/log/user-data.log";

const COMPOSE_URL: &str =
    "https://github.com/docker/compose/releases/latest/download/docker-compose-$(uname -s)-$(uname -m)";

/// Render the bootstrap script.
pub fn render(log_destination: &str, region: &str, service: &str) -> String {
    let lines = [
        "#!/bin/bash".to_string(),
        "set -e".to_string(),
        "set -x".to_string(),
        format!(
            "echo \"Writing service type '{}' to {}\"",
            service, SERVICE_MARKER
        ),
        format!("echo \"{}\" > {}", service, SERVICE_MARKER),
        format!(
            "echo \"Contents of {m}: $(cat {m})\"",
            m = SERVICE_MARKER
        ),
        "sudo yum update -y".to_string(),
        "sudo yum install -y amazon-cloudwatch-agent".to_string(),
        "sudo dnf install -y wget ruby docker".to_string(),
        "sudo systemctl start docker".to_string(),
        "sudo systemctl enable docker".to_string(),
        "sudo usermod -a -G docker ec2-user".to_string(),
        format!("sudo curl -L {} -o /usr/local/bin/docker-compose", COMPOSE_URL),
        "sudo chmod +x /usr/local/bin/docker-compose".to_string(),
        "docker-compose --version".to_string(),
        "sudo yum install -y jq".to_string(),
        format!("export SERVICE={}", service),
        format!("exec 1>>{} 2>&1", USER_DATA_LOG),
        "echo \"Finished User Data Execution at $(date)\"".to_string(),
        "sudo mkdir -p /etc/docker".to_string(),
        daemon_config(log_destination, region, service),
        "sudo systemctl restart docker".to_string(),
        "sudo systemctl status docker".to_string(),
    ];
    let mut script = lines.join("\n");
    script.push('\n');
    script
}

/// Container runtime config shipping every container's output to the log
/// destination, one stream per service.
fn daemon_config(log_destination: &str, region: &str, service: &str) -> String {
    format!(
        r#"sudo tee /etc/docker/daemon.json << EOF
{{
  "log-driver": "awslogs",
  "log-opts": {{
    "awslogs-group": "{}",
    "awslogs-region": "{}",
    "awslogs-stream": "{}"
  }}
}}
EOF"#,
        log_destination, region, service
    )
}

/// User data for a pool: the script with the log group and region left for
/// the apply engine to substitute.
pub fn user_data(log_group_id: &str, pool: Pool) -> Value {
    Value::sub(render(
        &format!("${{{}}}", log_group_id),
        "${AWS::Region}",
        pool.service_label(),
    ))
}
