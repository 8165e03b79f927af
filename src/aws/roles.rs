use tracing::{debug, info};

use crate::console::Console;
use crate::error::{Error, Result};

/// AWS IAM Role offered by the SAML assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamRole {
    pub role_arn: String,
    pub principal_arn: String,
}

impl IamRole {
    /// Split one `role_arn,principal_arn` attribute value on its first comma.
    pub fn parse_pair(value: &str) -> Result<Self> {
        let (role_arn, principal_arn) = value.trim().split_once(',').ok_or_else(|| {
            Error::SamlParse(format!("role attribute value `{}` has no comma", value.trim()))
        })?;

        Ok(Self {
            role_arn: role_arn.to_string(),
            principal_arn: principal_arn.to_string(),
        })
    }
}

/// Pick the role to assume and the local profile to store it under.
///
/// A configured role ARN must match a candidate; otherwise the user chooses. The profile is the
/// configured one or `{account}/{role}/{username}` derived from the chosen ARN.
pub fn select_role<C: Console + ?Sized>(
    roles: Vec<IamRole>,
    role_arn: Option<&str>,
    profile: Option<&str>,
    username: &str,
    console: &C,
) -> Result<(IamRole, String)> {
    let role = match role_arn {
        Some(arn) => find_configured_role(roles, arn)?,
        None => choose_role(roles, console)?,
    };
    info!("Selected role: {}", role.role_arn);

    let profile = match profile {
        Some(profile) => profile.to_string(),
        None => derive_profile_name(&role.role_arn, username)?,
    };
    debug!("Using profile: {}", profile);

    Ok((role, profile))
}

fn find_configured_role(roles: Vec<IamRole>, arn: &str) -> Result<IamRole> {
    let mut matches = roles.into_iter().filter(|r| r.role_arn == arn);
    let first = matches
        .next()
        .ok_or_else(|| Error::InvalidRole(format!("{arn} is not offered by the identity provider")))?;

    let mut principals = vec![first.principal_arn.clone()];
    for other in matches {
        if !principals.contains(&other.principal_arn) {
            principals.push(other.principal_arn);
        }
    }

    if principals.len() > 1 {
        return Err(Error::AmbiguousRole {
            role: arn.to_string(),
            principals,
        });
    }

    Ok(first)
}

fn choose_role<C: Console + ?Sized>(roles: Vec<IamRole>, console: &C) -> Result<IamRole> {
    if roles.is_empty() {
        return Err(Error::InvalidRole(
            "no roles found in SAML assertion".to_string(),
        ));
    }

    let items: Vec<String> = roles.iter().map(|r| r.role_arn.clone()).collect();
    let index = console.prompt_choice("Choose a role:", &items)?;
    let role = roles
        .into_iter()
        .nth(index)
        .ok_or_else(|| Error::InvalidRole("no role selected".to_string()))?;

    console.announce_success(&format!("Choose a role: {}", role.role_arn));
    Ok(role)
}

/// `arn:aws:iam::123456789012:role/Admin` + `me` -> `123456789012/Admin/me`
pub fn derive_profile_name(role_arn: &str, username: &str) -> Result<String> {
    let failed = || Error::ProfileNameDerivationFailed {
        role: role_arn.to_string(),
        username: username.to_string(),
    };

    let parts: Vec<&str> = role_arn.splitn(6, ':').collect();
    let [prefix, _partition, _service, _region, account_id, resource] = parts.as_slice() else {
        return Err(failed());
    };
    if *prefix != "arn" || account_id.is_empty() {
        return Err(failed());
    }

    let role_name = resource
        .split('/')
        .nth(1)
        .filter(|name| !name.is_empty())
        .ok_or_else(failed)?;

    Ok(format!("{account_id}/{role_name}/{username}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConsole;

    fn role(arn: &str, principal: &str) -> IamRole {
        IamRole {
            role_arn: arn.to_string(),
            principal_arn: principal.to_string(),
        }
    }

    fn candidates() -> Vec<IamRole> {
        vec![
            role(
                "arn:aws:iam::123456789012:role/Admin",
                "arn:aws:iam::123456789012:saml-provider/OneLogin",
            ),
            role(
                "arn:aws:iam::210987654321:role/ReadOnly",
                "arn:aws:iam::210987654321:saml-provider/OneLogin",
            ),
        ]
    }

    #[test]
    fn test_parse_pair_splits_on_first_comma() {
        let role = IamRole::parse_pair(" arn:aws:iam::1:role/A,arn:aws:iam::1:saml-provider/P,x ")
            .unwrap();
        assert_eq!(role.role_arn, "arn:aws:iam::1:role/A");
        assert_eq!(role.principal_arn, "arn:aws:iam::1:saml-provider/P,x");
    }

    #[test]
    fn test_configured_role_with_derived_profile() {
        let console = ScriptedConsole::default();
        let (role, profile) = select_role(
            candidates(),
            Some("arn:aws:iam::210987654321:role/ReadOnly"),
            None,
            "alice",
            &console,
        )
        .unwrap();

        assert_eq!(role, candidates()[1]);
        assert_eq!(profile, "210987654321/ReadOnly/alice");
        assert_eq!(console.choices_prompted(), 0);
    }

    #[test]
    fn test_configured_profile_wins() {
        let console = ScriptedConsole::default();
        let (_, profile) = select_role(
            candidates(),
            Some("arn:aws:iam::123456789012:role/Admin"),
            Some("work"),
            "alice",
            &console,
        )
        .unwrap();

        assert_eq!(profile, "work");
    }

    #[test]
    fn test_configured_role_not_offered() {
        let console = ScriptedConsole::default();
        let result = select_role(
            candidates(),
            Some("arn:aws:iam::999999999999:role/Nope"),
            None,
            "alice",
            &console,
        );

        assert!(matches!(result, Err(Error::InvalidRole(_))));
    }

    #[test]
    fn test_configured_role_with_two_principals_is_ambiguous() {
        let mut roles = candidates();
        roles.push(role(
            "arn:aws:iam::123456789012:role/Admin",
            "arn:aws:iam::123456789012:saml-provider/Other",
        ));
        let console = ScriptedConsole::default();

        let result = select_role(
            roles,
            Some("arn:aws:iam::123456789012:role/Admin"),
            None,
            "alice",
            &console,
        );

        match result {
            Err(Error::AmbiguousRole { principals, .. }) => assert_eq!(principals.len(), 2),
            other => panic!("expected AmbiguousRole, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let mut roles = candidates();
        roles.push(candidates()[0].clone());
        let console = ScriptedConsole::default();

        let (role, _) = select_role(
            roles,
            Some("arn:aws:iam::123456789012:role/Admin"),
            None,
            "alice",
            &console,
        )
        .unwrap();
        assert_eq!(role, candidates()[0]);
    }

    #[test]
    fn test_interactive_choice() {
        let console = ScriptedConsole::default().with_choices([1]);
        let (role, profile) = select_role(candidates(), None, None, "bob", &console).unwrap();

        assert_eq!(role, candidates()[1]);
        assert_eq!(profile, "210987654321/ReadOnly/bob");
        assert_eq!(console.choices_prompted(), 1);
    }

    #[test]
    fn test_no_roles_without_configuration() {
        let console = ScriptedConsole::default();
        let result = select_role(Vec::new(), None, None, "bob", &console);

        assert!(matches!(result, Err(Error::InvalidRole(_))));
    }

    #[test]
    fn test_derive_profile_name() {
        assert_eq!(
            derive_profile_name("arn:aws:iam::123456789012:role/Admin", "alice").unwrap(),
            "123456789012/Admin/alice"
        );
        assert_eq!(
            derive_profile_name("arn:aws:iam::123456789012:role/team/Dev", "alice").unwrap(),
            "123456789012/team/alice"
        );
    }

    #[test]
    fn test_derive_profile_name_failures() {
        for arn in [
            "not-an-arn",
            "arn:aws:iam::123456789012",
            "arn:aws:iam::123456789012:role",
            "arn:aws:iam:::role/Admin",
        ] {
            let result = derive_profile_name(arn, "alice");
            match result {
                Err(Error::ProfileNameDerivationFailed { role, username }) => {
                    assert_eq!(role, arn);
                    assert_eq!(username, "alice");
                }
                other => panic!("expected failure for {arn}, got {other:?}"),
            }
        }
    }
}
