use std::sync::Arc;

use patron_core::clock::SystemClock;
use patron_core::config::AuthConfig;
use patron_core::domain::customer::Customer;
use patron_core::dto::GetCustomerByCpfInput;
use patron_core::errors::ErrorKind;
use patron_server::presenter::{CustomerTokenPresenter, Presenter, PresenterInput};
use patron_server::token::JwtTokenIssuer;
use patron_server::usecase::CustomerService;
use serde::Deserialize;

use crate::commands::{prepare, CommandResult, Failure, Store};

pub fn run(cpf: &str, verify: bool) -> CommandResult {
    let (config, runtime) = match prepare("token") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let store = Store::open(&config).await?;
        let service = CustomerService::new(store.repository.clone(), Arc::new(SystemClock));
        let lookup = service.get_by_cpf(GetCustomerByCpfInput { cpf: cpf.to_string() }).await;
        store.close().await;

        match lookup {
            Ok(customer) => issue(&config.auth, customer, verify),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                Err(("not_found", format!("no customer holds cpf `{}`", cpf.trim()), 7u8))
            }
            Err(error) => Err(("customer_lookup", error.to_string(), 6u8)),
        }
    });

    match result {
        Ok(envelope) => CommandResult::success("token", envelope),
        Err(failure) => CommandResult::from_failure("token", failure),
    }
}

/// Renders the same envelope `POST /auth` returns.
fn issue(auth: &AuthConfig, customer: Customer, verify: bool) -> Result<String, Failure> {
    let subject = customer.id.to_string();
    let issuer = Arc::new(
        JwtTokenIssuer::from_config(auth, Arc::new(SystemClock))
            .map_err(|error| ("token_issuer", error.to_string(), 8u8))?,
    );
    let bytes = CustomerTokenPresenter::new(issuer.clone())
        .present(PresenterInput::Customer(customer))
        .map_err(|error| ("token_issuer", error.to_string(), 8u8))?;
    let envelope =
        String::from_utf8(bytes).map_err(|error| ("token_issuer", error.to_string(), 8u8))?;

    if verify {
        check_subject(&issuer, &envelope, &subject)?;
    }
    Ok(envelope)
}

fn check_subject(issuer: &JwtTokenIssuer, envelope: &str, subject: &str) -> Result<(), Failure> {
    let body: TokenEnvelope = serde_json::from_str(envelope)
        .map_err(|error| ("token_verification", error.to_string(), 9u8))?;
    let claims = issuer
        .verify(&body.access_token)
        .map_err(|error| ("token_verification", error.to_string(), 9u8))?;

    if claims.sub != subject {
        return Err((
            "token_verification",
            format!("token subject `{}` does not match customer `{subject}`", claims.sub),
            9u8,
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct TokenEnvelope {
    access_token: String,
}
