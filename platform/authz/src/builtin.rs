//! Policy shipped with the HR suite.

use crate::catalog::{CatalogBuilder, PolicyCatalog, RouteDefault};
use crate::error::PolicyError;
use crate::model::{Action, Resource, Role};

use Role::*;

/// Roles that work for the company, as opposed to candidates.
const STAFF: &[Role] = &[
    Recruiter,
    HrOps,
    HiringManager,
    Payroll,
    Finance,
    ItAdmin,
    Employee,
];

const GRANTS: &[(Resource, Action, &[Role])] = &[
    (Resource::Candidates, Action::View, &[Recruiter, HrOps, HiringManager]),
    (Resource::Candidates, Action::Create, &[Recruiter, HrOps]),
    (Resource::Candidates, Action::Edit, &[Recruiter, HrOps]),
    (Resource::Candidates, Action::Delete, &[HrOps]),
    (Resource::Candidates, Action::Assign, &[Recruiter, HiringManager]),
    (Resource::Jobs, Action::View, &[Recruiter, HrOps, HiringManager, Employee, Candidate]),
    (Resource::Jobs, Action::Create, &[Recruiter, HiringManager]),
    (Resource::Jobs, Action::Edit, &[Recruiter, HiringManager]),
    (Resource::Jobs, Action::Delete, &[Recruiter]),
    (Resource::Jobs, Action::Publish, &[Recruiter]),
    (Resource::Employees, Action::ViewAll, &[HrOps, Payroll, Finance]),
    (Resource::Employees, Action::ViewTeam, &[HiringManager]),
    (Resource::Employees, Action::ViewOwn, STAFF),
    (Resource::Employees, Action::Create, &[HrOps]),
    (Resource::Employees, Action::Edit, &[HrOps]),
    (Resource::Employees, Action::EditOwn, STAFF),
    (Resource::Employees, Action::Delete, &[Admin]),
    (Resource::Payroll, Action::View, &[Payroll, Finance]),
    (Resource::Payroll, Action::ViewOwn, STAFF),
    (Resource::Payroll, Action::RunPayroll, &[Payroll]),
    (Resource::Payroll, Action::EditSalary, &[Payroll]),
    (Resource::Payroll, Action::ApproveReimbursement, &[Payroll, Finance]),
    (Resource::Performance, Action::ViewAll, &[HrOps]),
    (Resource::Performance, Action::ViewTeam, &[HiringManager]),
    (Resource::Performance, Action::ViewOwn, STAFF),
    (Resource::Performance, Action::CreateReview, &[HrOps, HiringManager]),
    (Resource::Performance, Action::EditReview, &[HrOps, HiringManager]),
    (Resource::Compliance, Action::View, &[HrOps, Finance]),
    (Resource::Compliance, Action::Edit, &[HrOps]),
    (Resource::Compliance, Action::Export, &[HrOps, Finance]),
    (Resource::Analytics, Action::View, &[HrOps, Finance, Recruiter, HiringManager]),
    (Resource::Analytics, Action::Export, &[HrOps, Finance]),
    (Resource::Settings, Action::View, &[ItAdmin, HrOps]),
    (Resource::Settings, Action::Edit, &[ItAdmin]),
    (Resource::Settings, Action::Configure, &[ItAdmin]),
    (Resource::Interviews, Action::View, &[Recruiter, HrOps, HiringManager]),
    (Resource::Interviews, Action::ViewOwn, &[Candidate]),
    (Resource::Interviews, Action::Schedule, &[Recruiter, HrOps]),
    (Resource::Interviews, Action::GiveFeedback, &[Recruiter, HiringManager]),
    (Resource::Onboarding, Action::View, &[HrOps, ItAdmin, HiringManager]),
    (Resource::Onboarding, Action::ViewOwn, &[Employee]),
    (Resource::Onboarding, Action::Initiate, &[HrOps]),
    (Resource::Onboarding, Action::Edit, &[HrOps, ItAdmin]),
    (Resource::Offboarding, Action::View, &[HrOps, ItAdmin]),
    (Resource::Offboarding, Action::Initiate, &[HrOps, HiringManager]),
    (Resource::Offboarding, Action::Approve, &[HrOps]),
    (Resource::Tenants, Action::View, &[SuperAdmin]),
    (Resource::Tenants, Action::Create, &[SuperAdmin]),
    (Resource::Tenants, Action::Edit, &[SuperAdmin]),
];

const ROUTES: &[(&str, &[Role])] = &[
    ("/candidates", &[Recruiter, HrOps, HiringManager]),
    ("/jobs", &[Recruiter, HrOps, HiringManager]),
    ("/careers", &[Candidate]),
    ("/employees", &[HrOps, HiringManager, Payroll, Finance]),
    ("/payroll", &[Payroll, Finance]),
    ("/performance", &[HrOps, HiringManager, Employee]),
    ("/compliance", &[HrOps, Finance]),
    ("/analytics", &[HrOps, Finance, Recruiter, HiringManager]),
    ("/settings", &[ItAdmin]),
    ("/interviews", &[Recruiter, HrOps, HiringManager]),
    ("/onboarding", &[HrOps, ItAdmin, HiringManager]),
    ("/offboarding", &[HrOps, ItAdmin]),
];

const ROUTE_GRANTS: &[(&str, Resource, Action)] = &[
    ("/employees/new", Resource::Employees, Action::Create),
    ("/payroll/run", Resource::Payroll, Action::RunPayroll),
    ("/performance/reviews/new", Resource::Performance, Action::CreateReview),
    ("/interviews/schedule", Resource::Interviews, Action::Schedule),
];

const OPEN_ROUTES: &[&str] = &["/dashboard", "/profile"];

// Navigation entries of the suite. `/tenants` and `/audit-log` are meant for
// super_admin and admin but have no route entry; under the open default any
// authenticated role reaches them, and the audit reports both.
const DECLARED_ROUTES: &[&str] = &[
    "/dashboard",
    "/profile",
    "/candidates",
    "/jobs",
    "/employees",
    "/payroll",
    "/performance",
    "/compliance",
    "/analytics",
    "/settings",
    "/interviews",
    "/onboarding",
    "/offboarding",
    "/tenants",
    "/audit-log",
];

pub(crate) fn catalog() -> Result<PolicyCatalog, PolicyError> {
    let mut builder = CatalogBuilder::default().route_default(RouteDefault::Open);
    for (resource, action, roles) in GRANTS {
        builder = builder.grant(*resource, *action, roles);
    }
    for (path, roles) in ROUTES {
        builder = builder.route(*path, roles);
    }
    for (path, resource, action) in ROUTE_GRANTS {
        builder = builder.route_grant(*path, *resource, *action);
    }
    for path in OPEN_ROUTES {
        builder = builder.open_route(*path);
    }
    for path in DECLARED_ROUTES {
        builder = builder.declare_route(*path);
    }
    builder.build()
}
