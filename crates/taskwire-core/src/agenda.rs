use chrono::NaiveDate;

use crate::task::Task;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Bucket {
    Overdue,
    Today,
    Upcoming,
}

impl Bucket {
    /// Section order used by every rendering of an agenda.
    pub const ORDER: [Bucket; 3] = [Bucket::Overdue, Bucket::Today, Bucket::Upcoming];

    pub fn classify(due_date: NaiveDate, today: NaiveDate) -> Bucket {
        if due_date < today {
            Bucket::Overdue
        } else if due_date == today {
            Bucket::Today
        } else {
            Bucket::Upcoming
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Bucket::Overdue => "Overdue",
            Bucket::Today => "Today",
            Bucket::Upcoming => "Upcoming",
        }
    }
}

/// Pending tasks split by due date relative to a reference day.
///
/// Input order is preserved inside each bucket; the backend already sorted
/// the set, so nothing is re-sorted here.
#[derive(Debug, Default)]
pub struct Agenda<'a> {
    overdue: Vec<&'a Task>,
    today: Vec<&'a Task>,
    upcoming: Vec<&'a Task>,
}

impl<'a> Agenda<'a> {
    pub fn partition(tasks: &'a [Task], today: NaiveDate) -> Self {
        let mut agenda = Agenda::default();
        for task in tasks {
            match Bucket::classify(task.due_date, today) {
                Bucket::Overdue => agenda.overdue.push(task),
                Bucket::Today => agenda.today.push(task),
                Bucket::Upcoming => agenda.upcoming.push(task),
            }
        }
        agenda
    }

    pub fn bucket(&self, bucket: Bucket) -> &[&'a Task] {
        match bucket {
            Bucket::Overdue => &self.overdue,
            Bucket::Today => &self.today,
            Bucket::Upcoming => &self.upcoming,
        }
    }

    /// Non-empty buckets in section order.
    pub fn sections(&self) -> impl Iterator<Item = (Bucket, &[&'a Task])> + '_ {
        Bucket::ORDER
            .into_iter()
            .map(move |bucket| (bucket, self.bucket(bucket)))
            .filter(|(_, tasks)| !tasks.is_empty())
    }

    pub fn len(&self) -> usize {
        self.overdue.len() + self.today.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, Status};
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: i64, due: NaiveDate) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            due_date: due,
            priority: Priority::P1,
            status: Status::Todo,
            parent_id: None,
            user_id: "cli".to_string(),
            created_at: None,
        }
    }

    #[test]
    fn partition_covers_every_task_exactly_once() {
        let today = date(2026, 2, 2);
        let tasks: Vec<Task> = (0..30)
            .map(|offset| task(offset, date(2026, 1, 20) + chrono::Days::new(offset as u64)))
            .collect();
        let agenda = Agenda::partition(&tasks, today);

        assert_eq!(agenda.len(), tasks.len());
        let mut seen = HashSet::new();
        for bucket in Bucket::ORDER {
            for task in agenda.bucket(bucket) {
                assert_eq!(Bucket::classify(task.due_date, today), bucket);
                assert!(seen.insert(task.id), "task {} appears twice", task.id);
            }
        }
        assert_eq!(seen.len(), tasks.len());
    }

    #[test]
    fn sections_skip_empty_buckets_and_keep_order() {
        let today = date(2026, 2, 2);
        let tasks = vec![
            task(3, date(2026, 2, 5)),
            task(1, date(2026, 1, 1)),
            task(2, date(2026, 2, 9)),
        ];
        let agenda = Agenda::partition(&tasks, today);
        let sections: Vec<(Bucket, Vec<i64>)> = agenda
            .sections()
            .map(|(bucket, tasks)| (bucket, tasks.iter().map(|t| t.id).collect()))
            .collect();
        assert_eq!(
            sections,
            vec![(Bucket::Overdue, vec![1]), (Bucket::Upcoming, vec![3, 2])]
        );
    }

    #[test]
    fn empty_set_is_empty() {
        let agenda = Agenda::partition(&[], date(2026, 2, 2));
        assert!(agenda.is_empty());
        assert_eq!(agenda.sections().count(), 0);
    }
}
