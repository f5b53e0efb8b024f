//! HTTP status tables for the two error taxonomies a worker can produce
//! (`spec.md` §6, "Error mapping (worker -> HTTP)").

use zenith_dataservice::{DataServiceError, DomainError, InfrastructureError};

pub fn infrastructure_status(e: &InfrastructureError) -> u16 {
    match e {
        InfrastructureError::Timeout => 504,
        InfrastructureError::ConnectionFailed => 502,
        InfrastructureError::Protocol(_)
        | InfrastructureError::UnresolvedService(_)
        | InfrastructureError::MalformedResponse(_) => 503,
    }
}

pub fn domain_status(e: &DomainError) -> u16 {
    match e {
        DomainError::LinkNotFound => 404,
        DomainError::LinkAlreadyExists => 409,
        DomainError::InvalidUrl => 400,
        DomainError::InvalidShortCode | DomainError::LinkExpired | DomainError::CodeGenerationFailed | DomainError::Unknown(_) => 500,
    }
}

pub fn error_status(e: &DataServiceError) -> u16 {
    match e {
        DataServiceError::Domain(d) => domain_status(d),
        DataServiceError::Infrastructure(i) => infrastructure_status(i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_codes_match_the_stated_table() {
        assert_eq!(domain_status(&DomainError::LinkNotFound), 404);
        assert_eq!(domain_status(&DomainError::LinkAlreadyExists), 409);
        assert_eq!(domain_status(&DomainError::InvalidUrl), 400);
        assert_eq!(domain_status(&DomainError::CodeGenerationFailed), 500);
    }

    #[test]
    fn infrastructure_codes_match_the_stated_table() {
        assert_eq!(infrastructure_status(&InfrastructureError::Timeout), 504);
        assert_eq!(infrastructure_status(&InfrastructureError::ConnectionFailed), 502);
        assert_eq!(infrastructure_status(&InfrastructureError::Protocol("x".into())), 503);
    }
}
