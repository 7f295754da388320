//! Ansible inventory
//!
//! Renders a collected instance dump as an INI-style Ansible inventory: one
//! group per scope, one host line per named and reachable instance.

use crate::engine::Collection;
use crate::resource::extract_json_value;
use serde_json::Value;
use std::fmt::Write;

/// Path of the public address of an instance
const PUBLIC_HOST_PATH: &str = "networkInterfaces.0.accessConfigs.0.natIP";

/// Path of the private address of an instance
const PRIVATE_HOST_PATH: &str = "networkInterfaces.0.networkIP";

/// Host line for one instance, or `None` when it has no usable name or address
fn host_entry(instance: &Value, private: bool) -> Option<(String, String)> {
    let name: String = instance
        .get("name")
        .and_then(|v| v.as_str())?
        .chars()
        .filter(|c| *c != ' ')
        .collect();
    if name.is_empty() {
        return None;
    }

    let path = if private {
        PRIVATE_HOST_PATH
    } else {
        PUBLIC_HOST_PATH
    };
    let host = extract_json_value(instance, path).filter(|h| !h.is_empty())?;

    Some((name, host))
}

/// Build the inventory text; groups follow the collection's sorted scope order
pub fn build_ansible_inventory(instances: &Collection<Value>, private: bool) -> String {
    let mut inventory = String::new();

    for (scope, entry) in instances.iter() {
        if !inventory.is_empty() {
            inventory.push('\n');
        }
        // Writing into a String cannot fail
        let _ = writeln!(inventory, "[{}]", scope);

        for instance in entry.records().unwrap_or_default() {
            if let Some((name, host)) = host_entry(instance, private) {
                let _ = writeln!(inventory, "{} ansible_ssh_host={}", name, host);
            }
        }
    }

    inventory
}
