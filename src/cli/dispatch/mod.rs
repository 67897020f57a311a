use crate::cli::{
    actions::{server::Args, Action},
    commands::{accounts, store, ARG_PORT},
};
use anyhow::Result;

/// Build the [`Action`] to run from parsed arguments.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let store = store::Options::parse(matches)?;
    let accounts = accounts::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        store,
        accounts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::store::StoreKind;

    #[test]
    fn application_secret_required() {
        temp_env::with_vars_unset(["REGISTRAR_APPLICATION_SECRET"], || {
            let matches = crate::cli::commands::new().get_matches_from(vec!["registrar"]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err
                    .to_string()
                    .contains("missing required argument: --application-secret"));
            }
        });
    }

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("REGISTRAR_APPLICATION_SECRET", Some("secret")),
                ("REGISTRAR_STORE", Some("memory")),
                ("REGISTRAR_PORT", Some("3000")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["registrar"]);
                let action = handler(&matches);
                assert!(action.is_ok());
                if let Ok(Action::Server(args)) = action {
                    assert_eq!(args.port, 3000);
                    assert_eq!(args.store.kind, StoreKind::Memory);
                }
            },
        );
    }
}
