use ferrous_forwarder_domain::Question;
use hickory_proto::op::{Message, Query};

/// Cache and routing key for one question of a query.
pub fn question_from_query(query: &Query) -> Question {
    Question::new(
        query.name().to_ascii(),
        u16::from(query.query_class()),
        u16::from(query.query_type()),
    )
}

/// Copy of `message` whose question section holds only `query`.
pub fn with_single_query(message: &Message, query: &Query) -> Message {
    let mut sub_query = message.clone();
    sub_query.take_queries();
    sub_query.add_query(query.clone());
    sub_query
}
