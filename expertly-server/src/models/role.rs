//! User roles and the role-guard rule

text_enum! {
    /// Account role. New accounts start as `Customer`.
    pub enum Role {
        field = "role";
        Customer => "customer",
        Member => "member",
        Admin => "admin",
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Customer
    }
}

impl Role {
    /// A user passes a guard for `required` when they hold exactly that
    /// role, or are an admin.
    pub fn satisfies(self, required: Role) -> bool {
        self == required || self == Role::Admin
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_role_passes() {
        assert!(Role::Member.satisfies(Role::Member));
        assert!(Role::Customer.satisfies(Role::Customer));
    }

    #[test]
    fn admin_passes_every_guard() {
        for required in Role::ALL {
            assert!(Role::Admin.satisfies(*required));
        }
    }

    #[test]
    fn roles_are_not_ordered() {
        // member does not imply customer
        assert!(!Role::Member.satisfies(Role::Customer));
        assert!(!Role::Customer.satisfies(Role::Member));
        assert!(!Role::Member.satisfies(Role::Admin));
    }

    #[test]
    fn parse_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
