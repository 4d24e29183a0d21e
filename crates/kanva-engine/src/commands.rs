// SPDX-FileCopyrightText: 2026 Kanva Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash-command layer.
//!
//! Commands manage per-user state (backend services, saved prompts,
//! quality preference); the generation path itself never runs through
//! here. Replies are plain text.

use kanva_core::KanvaError;
use kanva_core::types::{BackendVariant, InboundEvent, Quality};
use kanva_gemini::aspect;
use kanva_storage::queries::{prompts, services, settings};
use kanva_storage::queries::services::NewBackendService;
use std::str::FromStr;

use crate::EngineDeps;
use crate::resolver::mask_secret;

const HELP_TEXT: &str = "\
Send me a prompt, a photo, or both and I will generate an image.

Inline parameters:
  @16:9  aspect ratio (full list below)
  @4K    quality tier (1K, 2K, 4K)
  @s     in an album, use only this photo

Commands:
  /service  manage generation backends
  /save <name> <text>  save a prompt
  /list     list saved prompts
  /delete <name>  delete a saved prompt
  /history  recent prompts
  /settings [1K|2K|4K]  show or set default quality";

const SERVICE_USAGE: &str = "\
Usage:
  /service list
  /service add <name> <standard|custom|vertex> <api_key> [args]
      standard: [model]
      custom:   <base_url> [model]
      vertex:   <project> <location> [model]
  /service use <id>
  /service delete <id>";

/// True when the event is a command this layer consumes.
pub fn is_command(text: &str) -> bool {
    text.starts_with('/')
}

/// Dispatch one `/command` message. Unknown commands get the help text.
pub async fn handle_command(deps: &EngineDeps, event: &InboundEvent) -> Result<(), KanvaError> {
    let text = event.text.as_deref().unwrap_or("").trim();
    let mut words = text.split_whitespace();
    let command = words.next().unwrap_or("");
    // Group chats address commands as /cmd@botname.
    let command = command.split('@').next().unwrap_or(command);
    let rest: Vec<&str> = words.collect();

    let reply = match command {
        "/start" | "/help" => help_text(),
        "/service" => service_command(deps, event.user_id, &rest).await?,
        "/save" => save_command(deps, event.user_id, &rest).await?,
        "/list" => list_command(deps, event.user_id).await?,
        "/delete" => delete_command(deps, event.user_id, &rest).await?,
        "/history" => history_command(deps, event.user_id).await?,
        "/settings" => settings_command(deps, event.user_id, &rest).await?,
        _ => help_text(),
    };

    deps.channel
        .send_text(event.chat_id, &reply, Some(event.message_id))
        .await?;
    Ok(())
}

fn help_text() -> String {
    format!(
        "{HELP_TEXT}\n\nSupported ratios: {}",
        aspect::supported_ratios().join(", ")
    )
}

async fn service_command(
    deps: &EngineDeps,
    user_id: i64,
    args: &[&str],
) -> Result<String, KanvaError> {
    match args.first().copied() {
        None | Some("help") => Ok(SERVICE_USAGE.to_string()),
        Some("list") => {
            let all = services::list_services(&deps.db, user_id).await?;
            if all.is_empty() {
                return Ok("No services configured. Add one with /service add.".to_string());
            }
            let mut out = String::from("Your services:\n");
            for svc in &all {
                let marker = if svc.is_default { "★ " } else { "  " };
                out.push_str(&format!(
                    "{marker}#{} {} [{}] key {}\n",
                    svc.id,
                    svc.name,
                    svc.variant,
                    mask_secret(&svc.api_key)
                ));
            }
            out.push_str("\nSwitch with /service use <id>.");
            Ok(out)
        }
        Some("add") => match parse_service_add(user_id, &args[1..]) {
            Ok(new_service) => {
                let name = new_service.name.clone();
                let id = services::add_service(&deps.db, new_service).await?;
                Ok(format!("Added service {name} (#{id}) and made it the default."))
            }
            Err(message) => Ok(format!("{message}\n\n{SERVICE_USAGE}")),
        },
        Some("use") => {
            let Some(id) = args.get(1).and_then(|v| v.parse::<i64>().ok()) else {
                return Ok(SERVICE_USAGE.to_string());
            };
            if services::set_default_service(&deps.db, user_id, id).await? {
                Ok(format!("Service #{id} is now the default."))
            } else {
                Ok(format!("You have no service #{id}."))
            }
        }
        Some("delete") => {
            let Some(id) = args.get(1).and_then(|v| v.parse::<i64>().ok()) else {
                return Ok(SERVICE_USAGE.to_string());
            };
            if services::delete_service(&deps.db, user_id, id).await? {
                Ok(format!("Service #{id} deleted."))
            } else {
                Ok(format!("You have no service #{id}."))
            }
        }
        Some(_) => Ok(SERVICE_USAGE.to_string()),
    }
}

/// Parse `/service add` arguments into an insertable record.
///
/// Errors are user-facing strings, not [`KanvaError`]: a malformed command
/// is a conversation, not a fault.
fn parse_service_add(user_id: i64, args: &[&str]) -> Result<NewBackendService, String> {
    let [name, variant, api_key, extra @ ..] = args else {
        return Err("Missing arguments.".to_string());
    };
    let variant = BackendVariant::from_str(variant)
        .map_err(|_| format!("Unknown service type \"{variant}\"."))?;

    let mut service = NewBackendService {
        owner_user_id: user_id,
        name: (*name).to_string(),
        variant,
        api_key: (*api_key).to_string(),
        base_url: String::new(),
        project_id: String::new(),
        location: String::new(),
        model: String::new(),
    };

    match variant {
        BackendVariant::Standard => {
            if let Some(model) = extra.first() {
                service.model = (*model).to_string();
            }
        }
        BackendVariant::Custom => {
            let Some(base_url) = extra.first() else {
                return Err("Custom services need a base URL.".to_string());
            };
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with http:// or https://.".to_string());
            }
            service.base_url = (*base_url).to_string();
            if let Some(model) = extra.get(1) {
                service.model = (*model).to_string();
            }
        }
        BackendVariant::Vertex => {
            let (Some(project), Some(location)) = (extra.first(), extra.get(1)) else {
                return Err("Vertex services need a project and a location.".to_string());
            };
            service.project_id = (*project).to_string();
            service.location = (*location).to_string();
            if let Some(model) = extra.get(2) {
                service.model = (*model).to_string();
            }
        }
    }
    Ok(service)
}

async fn save_command(deps: &EngineDeps, user_id: i64, args: &[&str]) -> Result<String, KanvaError> {
    let [name, content @ ..] = args else {
        return Ok("Usage: /save <name> <prompt text>".to_string());
    };
    if content.is_empty() {
        // Bare /save <name> shows the stored text.
        return match prompts::get_prompt(&deps.db, user_id, name).await? {
            Some(saved) => Ok(format!("{}: {}", saved.name, saved.content)),
            None => Ok("Usage: /save <name> <prompt text>".to_string()),
        };
    }
    prompts::save_prompt(&deps.db, user_id, name, &content.join(" ")).await?;
    Ok(format!(
        "Saved prompt \"{name}\" and made it the default for image-only requests."
    ))
}

async fn list_command(deps: &EngineDeps, user_id: i64) -> Result<String, KanvaError> {
    let all = prompts::list_prompts(&deps.db, user_id).await?;
    if all.is_empty() {
        return Ok("No saved prompts. Save one with /save <name> <text>.".to_string());
    }
    let mut out = String::from("Saved prompts:\n");
    for p in &all {
        let marker = if p.is_default { "★ " } else { "  " };
        out.push_str(&format!("{marker}{}: {}\n", p.name, p.content));
    }
    out.push_str("\n★ is used when an image arrives without text.");
    Ok(out)
}

async fn delete_command(
    deps: &EngineDeps,
    user_id: i64,
    args: &[&str],
) -> Result<String, KanvaError> {
    let Some(name) = args.first() else {
        return Ok("Usage: /delete <name>".to_string());
    };
    if prompts::delete_prompt(&deps.db, user_id, name).await? {
        Ok(format!("Deleted prompt \"{name}\"."))
    } else {
        Ok(format!("No saved prompt named \"{name}\"."))
    }
}

async fn history_command(deps: &EngineDeps, user_id: i64) -> Result<String, KanvaError> {
    let recent = prompts::recent_history(&deps.db, user_id, 10).await?;
    if recent.is_empty() {
        return Ok("No prompt history yet.".to_string());
    }
    let mut out = String::from("Recent prompts:\n");
    for (idx, entry) in recent.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", idx + 1, entry.prompt));
    }
    Ok(out)
}

async fn settings_command(
    deps: &EngineDeps,
    user_id: i64,
    args: &[&str],
) -> Result<String, KanvaError> {
    match args.first() {
        None => {
            let current = settings::get_quality(&deps.db, user_id)
                .await?
                .and_then(|raw| Quality::from_str(&raw).ok())
                .unwrap_or_default();
            Ok(format!(
                "Default quality: {current}. Change with /settings <1K|2K|4K>."
            ))
        }
        Some(raw) => match Quality::from_str(raw) {
            Ok(quality) => {
                settings::set_quality(&deps.db, user_id, &quality.to_string()).await?;
                Ok(format!("Default quality set to {quality}."))
            }
            Err(_) => Ok("Supported qualities: 1K, 2K, 4K.".to_string()),
        },
    }
}
