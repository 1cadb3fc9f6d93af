//! User subcommands: list, register, delete, online, password reset.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::PathBuf;

use wilma_client::api::{NewUser, ProfileUpdate};

use crate::context::Context;
use crate::output_fmt::{write_ack, write_user_row};

/// User subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum UserAction {
    /// List users with their online status.
    List,
    /// Register a new user (admin only).
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "WILMA_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
        /// Role, e.g. `User` or `Admin`.
        #[arg(short, long, default_value = "User")]
        role: String,
    },
    /// Delete a user (admin only).
    Delete {
        /// User ID.
        id: i64,
    },
    /// Show how many users are online.
    Online,
    /// Update your own profile.
    Profile {
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        location: String,
        /// Image file to upload as the profile picture.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Request a password reset email.
    ForgotPassword {
        email: String,
    },
    /// Set a new password with a reset token.
    ResetPassword {
        #[arg(long)]
        token: String,
        #[arg(long, env = "WILMA_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Execute a user subcommand.
pub async fn run(action: UserAction, ctx: &Context) -> anyhow::Result<()> {
    let users = ctx.users();
    let mut out = io::stdout();
    match action {
        UserAction::List => {
            ctx.require_login()?;
            let list = users.list_with_status().await?;
            if list.is_empty() {
                writeln!(out, "No users")?;
            }
            for user in &list {
                write_user_row(&mut out, user)?;
            }
        }
        UserAction::Register {
            username,
            email,
            password,
            role,
        } => {
            ctx.require_login()?;
            let ack = users
                .register(&NewUser {
                    username,
                    email,
                    password,
                    role,
                })
                .await?;
            write_ack(&mut out, &ack.message, "User registered")?;
        }
        UserAction::Delete { id } => {
            ctx.require_login()?;
            let ack = users.delete(id).await?;
            write_ack(&mut out, &ack.message, "User deleted")?;
        }
        UserAction::Online => {
            ctx.require_login()?;
            let count = users.online_count().await?;
            writeln!(out, "{count} online")?;
        }
        UserAction::Profile {
            phone,
            location,
            image,
        } => {
            ctx.require_login()?;
            let profile_image_url = match image {
                Some(path) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .ok_or_else(|| anyhow::anyhow!("Not a file: {}", path.display()))?;
                    let bytes = std::fs::read(&path)?;
                    users.upload_profile_image(&file_name, bytes, None).await?
                }
                None => ctx
                    .gateway
                    .session()
                    .principal()
                    .and_then(|p| p.profile_image_url)
                    .unwrap_or_default(),
            };
            let ack = users
                .update_profile(&ProfileUpdate {
                    phone_number: phone,
                    location,
                    profile_image_url,
                })
                .await?;
            write_ack(&mut out, &ack.message, "Profile updated")?;
        }
        UserAction::ForgotPassword { email } => {
            let ack = users.forgot_password(&email).await?;
            write_ack(&mut out, &ack.message, "Reset email requested")?;
        }
        UserAction::ResetPassword { token, password } => {
            let ack = users.reset_password(&token, &password).await?;
            write_ack(&mut out, &ack.message, "Password changed")?;
        }
    }
    Ok(())
}
