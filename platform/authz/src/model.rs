//! Closed vocabularies of the policy: roles, resources and actions.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// A name that is not a member of one of the policy vocabularies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} `{name}`")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownName {
                        kind: $kind,
                        name: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

vocabulary! {
    /// Identity category of an actor. `Admin` carries the override rule
    /// documented on [`crate::PolicyEngine`].
    Role as "role" {
        Admin => "admin",
        SuperAdmin => "super_admin",
        Recruiter => "recruiter",
        HrOps => "hr_ops",
        HiringManager => "hiring_manager",
        Payroll => "payroll",
        Finance => "finance",
        ItAdmin => "it_admin",
        Employee => "employee",
        Candidate => "candidate",
    }
}

vocabulary! {
    /// Domain noun subject to access control.
    Resource as "resource" {
        Candidates => "candidates",
        Jobs => "jobs",
        Employees => "employees",
        Payroll => "payroll",
        Performance => "performance",
        Compliance => "compliance",
        Analytics => "analytics",
        Settings => "settings",
        Interviews => "interviews",
        Onboarding => "onboarding",
        Offboarding => "offboarding",
        Tenants => "tenants",
    }
}

vocabulary! {
    /// Operation scoped to a resource. The same action can mean different
    /// things under different resources, so grants are keyed by the pair.
    Action as "action" {
        View => "view",
        Create => "create",
        Edit => "edit",
        Delete => "delete",
        Assign => "assign",
        Publish => "publish",
        Export => "export",
        Configure => "configure",
        ViewAll => "viewAll",
        ViewTeam => "viewTeam",
        ViewOwn => "viewOwn",
        EditOwn => "editOwn",
        RunPayroll => "runPayroll",
        EditSalary => "editSalary",
        ApproveReimbursement => "approveReimbursement",
        CreateReview => "createReview",
        EditReview => "editReview",
        Schedule => "schedule",
        GiveFeedback => "giveFeedback",
        Initiate => "initiate",
        Approve => "approve",
    }
}
