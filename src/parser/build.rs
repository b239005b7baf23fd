use crate::{domain::Expression, parser::Token};

/// Reduces a postfix token stream to a flattened expression.
///
/// Each operator combines the two operands below it, keeping them in reading
/// order. An operator with only one operand available leaves that operand in
/// place. Returns `None` if the stream yields no operand at all.
#[must_use]
pub fn build_expression(postfix: Vec<Token>) -> Option<Expression> {
    let mut stack: Vec<Expression> = Vec::new();

    for token in postfix {
        match token {
            Token::Code(code) => stack.push(Expression::Leaf(code)),
            Token::Operator(operator) => {
                let Some(right) = stack.pop() else {
                    continue;
                };
                let combined = match stack.pop() {
                    Some(left) => Expression::Node(operator, vec![left, right]),
                    None => right,
                };
                stack.push(combined);
            }
            Token::Open | Token::Close => {}
        }
    }

    stack.pop().map(Expression::flatten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModuleCode, Operator};

    fn code(s: &str) -> ModuleCode {
        ModuleCode::try_from(s).unwrap()
    }

    #[test]
    fn operands_keep_reading_order() {
        let postfix = vec![
            Token::Code(code("CS2100")),
            Token::Code(code("CS2106")),
            Token::Operator(Operator::Or),
        ];

        assert_eq!(
            build_expression(postfix),
            Some(Expression::Node(
                Operator::Or,
                vec![Expression::Leaf(code("CS2100")), Expression::Leaf(code("CS2106"))]
            ))
        );
    }

    #[test]
    fn chains_are_flattened() {
        let postfix = vec![
            Token::Code(code("CS1010")),
            Token::Code(code("CS1020")),
            Token::Operator(Operator::And),
            Token::Code(code("CS1030")),
            Token::Operator(Operator::And),
        ];

        assert_eq!(
            build_expression(postfix),
            Some(Expression::Node(
                Operator::And,
                vec![
                    Expression::Leaf(code("CS1010")),
                    Expression::Leaf(code("CS1020")),
                    Expression::Leaf(code("CS1030")),
                ]
            ))
        );
    }

    #[test]
    fn operator_underflow_keeps_the_operand() {
        let postfix = vec![Token::Code(code("CS1010")), Token::Operator(Operator::And)];
        assert_eq!(build_expression(postfix), Some(Expression::Leaf(code("CS1010"))));

        let postfix = vec![Token::Operator(Operator::Or), Token::Code(code("CS1020"))];
        assert_eq!(build_expression(postfix), Some(Expression::Leaf(code("CS1020"))));
    }

    #[test]
    fn empty_stream_builds_nothing() {
        assert_eq!(build_expression(Vec::new()), None);
    }
}
