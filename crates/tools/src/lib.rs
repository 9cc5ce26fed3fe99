//! Tools for the lead agent
//!
//! MCP-style tool interface, pure lookups over the reference data, the
//! stateless catering tools built on them, and the notification sinks that
//! deliver finished leads to sales.

pub mod catering;
pub mod integrations;
pub mod lookup;
pub mod mcp;
pub mod registry;

pub use catering::{
    order_minimum_message, BusinessRulesTool, CheckOrderMinimumTool, CheckServiceAreaTool,
    ExtractContactInfoTool, FindRestaurantPartnersTool, OrderSizeTier,
};
pub use integrations::{
    render_lead_email, IntegrationError, LeadEmail, LogNotificationSink, NotificationReceipt,
    NotificationSink, WebhookNotificationSink,
};
pub use lookup::{
    business_rules, check_area, check_area_in_state, extract_contact_info, find_partners,
    ContactInfo, PartnerQuery,
};
pub use mcp::{
    ContentBlock, ErrorCode, InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema,
};
pub use registry::{create_registry, ToolExecutor, ToolRegistry};
