//! The permission catalogue and the default roles seeded from it.

/// `(name, description)` for every permission the service knows about.
pub const PERMISSIONS: &[(&str, &str)] = &[
  ("auth:profile", "View logged-in user profile"),
  ("user:create", "Create a new user"),
  ("user:read", "View list or detail of users"),
  ("user:update", "Update user data"),
  ("user:delete", "Delete user"),
  ("user:assign-role", "Assign role to user"),
  ("user:manage", "Full user management"),
  ("achievement:create", "Create achievement"),
  ("achievement:read", "Read achievements"),
  ("achievement:update", "Update achievement"),
  ("achievement:delete", "Delete achievement"),
  ("achievement:submit", "Submit for verification"),
  ("achievement:view-advisee", "View advisee achievements"),
  ("achievement:verify", "Verify student achievement"),
  ("achievement:reject", "Reject student achievement"),
  ("student:read", "View student list"),
  ("student:update", "Update student data"),
  ("lecturer:read", "View lecturers"),
  ("lecturer:advisee-list", "View lecturer advisee list"),
  ("report:statistics", "View achievement statistics"),
  ("report:student", "View student-specific report"),
];

const STUDENT: &[&str] = &[
  "achievement:create",
  "achievement:read",
  "achievement:update",
  "achievement:delete",
  "achievement:submit",
  "report:statistics",
  "report:student",
  "auth:profile",
];

const ADVISOR: &[&str] = &[
  "achievement:read",
  "achievement:view-advisee",
  "achievement:verify",
  "achievement:reject",
  "lecturer:advisee-list",
  "report:statistics",
  "report:student",
  "auth:profile",
];

/// Role name and its permissions. `None` grants the whole catalogue.
pub const DEFAULT_ROLES: &[(&str, Option<&[&str]>)] = &[
  ("admin", None),
  ("student", Some(STUDENT)),
  ("advisor", Some(ADVISOR)),
];
