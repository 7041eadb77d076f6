use crate::auth::{clear_stored_session, load_stored_session};
use crate::cli::AuthCommands;
use crate::commands::common::{load_remote_context, resolve_profile_name};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login {
            profile,
            email,
            password,
        } => {
            let context = load_remote_context(profile.as_deref().or(global_profile))?;
            let session = context
                .auth
                .sign_in(&email, &password)
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!(
                "Signed in profile '{}' as {email_label}",
                context.profile_name
            );
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let profile = profile.as_deref().or(global_profile);
            let (profile_name, session) = match load_remote_context(profile) {
                Ok(context) => {
                    let session = context
                        .auth
                        .restore_session()
                        .await
                        .map_err(|error| CliError::Auth(error.to_string()))?;
                    (context.profile_name, session)
                }
                Err(CliError::RemoteNotConfigured) => {
                    let profile_name = resolve_profile_name(profile)?;
                    let session = load_stored_session(&profile_name)
                        .map_err(|error| CliError::Auth(error.to_string()))?;
                    println!("Profile '{profile_name}' has no remote configured.");
                    (profile_name, session)
                }
                Err(error) => return Err(error),
            };

            if let Some(session) = session {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Profile '{}' is signed in as {} (user_id={}, expires_at={})",
                    profile_name, email_label, session.user.id, session.expires_at
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let profile = profile.as_deref().or(global_profile);
            let profile_name = resolve_profile_name(profile)?;
            let stored_session = load_stored_session(&profile_name)
                .map_err(|error| CliError::Auth(error.to_string()))?;

            match (load_remote_context(profile), stored_session) {
                (Ok(context), Some(session)) => context
                    .auth
                    .sign_out(&session.access_token)
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?,
                _ => clear_stored_session(&profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?,
            }

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}
