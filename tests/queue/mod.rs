mod pg_queue;
